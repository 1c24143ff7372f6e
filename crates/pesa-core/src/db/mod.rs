//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Ledger entries
//! - `profiles` - Per-period financial profiles
//! - `advice_cache` - Cached advice, one row per user
//! - `alerts` - Rule engine alerts
//! - `insight_cache` - Hash-keyed alert explanations

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::{Error, Result};

mod advice_cache;
mod alerts;
mod insight_cache;
mod profiles;
mod transactions;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "PESA_DB_KEY";

/// Timestamp format used for every DATETIME column
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"pesa-salt-v1-fix";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Format a timestamp for storage
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse a SQLite datetime string, `None` if it is not in the stored format
pub(crate) fn try_parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Parse a display timestamp, falling back to now
///
/// Freshness checks use [`try_parse_datetime`] so a bad value reads as expired.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    try_parse_datetime(s).unwrap_or_else(Utc::now)
}

/// Parse a stored decimal; amounts are written by this crate so a bad value
/// means the row was edited by hand
pub(crate) fn parse_decimal(s: &str, column: usize) -> rusqlite::Result<Decimal> {
    s.parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_date(s: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `PESA_DB_KEY` environment variable to be set. Returns an
    /// error if it is not; use `new_unencrypted()` for development.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "pesa_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Ledger entries; amount is a non-negative decimal string
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount TEXT NOT NULL,
                date TEXT NOT NULL,                  -- YYYY-MM-DD
                type TEXT NOT NULL,                  -- income, expense
                category TEXT NOT NULL DEFAULT 'Other',
                description TEXT NOT NULL DEFAULT '',
                counterparty TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);

            -- One profile per (user, month)
            CREATE TABLE IF NOT EXISTS financial_profiles (
                user_id TEXT NOT NULL,
                period_key TEXT NOT NULL,            -- YYYY-MM
                total_income TEXT NOT NULL,
                total_expenses TEXT NOT NULL,
                savings TEXT NOT NULL,
                savings_rate REAL NOT NULL,
                top_category TEXT,
                computed_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, period_key)
            );

            -- Cached advice, one row per user
            CREATE TABLE IF NOT EXISTS advice_cache (
                user_id TEXT PRIMARY KEY,
                context_hash TEXT,
                advice_text TEXT,
                last_profile_snapshot TEXT,          -- JSON ProfileSnapshot
                last_generated_at DATETIME,
                alert_summary TEXT
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                category TEXT NOT NULL,
                severity TEXT NOT NULL,              -- info, warning, critical
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_user ON alerts(user_id, created_at);

            -- Alert explanations keyed by a hash of the alert and its transaction context
            CREATE TABLE IF NOT EXISTS insight_cache (
                user_id TEXT NOT NULL,
                context_hash TEXT NOT NULL,
                alert_title TEXT NOT NULL,
                alert_message TEXT NOT NULL,
                transaction_summary TEXT NOT NULL,   -- JSON [TransactionSummary]
                response TEXT NOT NULL,
                last_refreshed_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, context_hash)
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
