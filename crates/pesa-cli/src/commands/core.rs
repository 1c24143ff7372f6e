//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Advisor config with fallback to defaults
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use pesa_core::config::AdvisorConfig;
use pesa_core::db::Database;
use tracing::warn;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the advisor config, falling back to the embedded defaults
pub fn load_config() -> AdvisorConfig {
    AdvisorConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load advisor config, using defaults: {}", e);
        AdvisorConfig::default()
    })
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    match AdvisorConfig::override_path() {
        Some(path) if path.exists() => println!("   Config: {}", path.display()),
        _ => println!("   Config: built-in defaults"),
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record transactions: pesa add 2500 --type income --category salary");
    println!("  2. Get advice: pesa advice");
    println!("  3. Start web API: pesa serve");

    Ok(())
}
