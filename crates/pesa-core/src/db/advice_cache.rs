//! Advice cache rows (one per user)

use rusqlite::{params, OptionalExtension, Row};

use super::{format_datetime, try_parse_datetime, Database};
use crate::error::Result;
use crate::models::{AdviceCacheEntry, ProfileSnapshot};

fn row_to_entry(row: &Row) -> rusqlite::Result<AdviceCacheEntry> {
    let snapshot: Option<String> = row.get(3)?;
    let generated_at: Option<String> = row.get(4)?;

    Ok(AdviceCacheEntry {
        user_id: row.get(0)?,
        context_hash: row.get(1)?,
        advice_text: row.get(2)?,
        // An unreadable snapshot is treated as missing, which forces regeneration
        last_profile_snapshot: snapshot
            .and_then(|s| serde_json::from_str::<ProfileSnapshot>(&s).ok()),
        // Likewise an unreadable timestamp, which the staleness policy treats as expired
        last_generated_at: generated_at.and_then(|s| try_parse_datetime(&s)),
        alert_summary: row.get(5)?,
    })
}

impl Database {
    /// Get the cache entry for a user
    pub fn get_cache_entry(&self, user_id: &str) -> Result<Option<AdviceCacheEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                r#"
                SELECT user_id, context_hash, advice_text, last_profile_snapshot,
                       last_generated_at, alert_summary
                FROM advice_cache WHERE user_id = ?
                "#,
                params![user_id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Write generated advice and its snapshot in a single statement
    ///
    /// The alert summary is only overwritten when the entry carries one, so
    /// summaries written by alert generation survive advice regeneration.
    pub fn upsert_cache_entry(&self, entry: &AdviceCacheEntry) -> Result<()> {
        let snapshot = entry
            .last_profile_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO advice_cache
                (user_id, context_hash, advice_text, last_profile_snapshot, last_generated_at, alert_summary)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                context_hash = excluded.context_hash,
                advice_text = excluded.advice_text,
                last_profile_snapshot = excluded.last_profile_snapshot,
                last_generated_at = excluded.last_generated_at,
                alert_summary = COALESCE(excluded.alert_summary, advice_cache.alert_summary)
            "#,
            params![
                entry.user_id,
                entry.context_hash,
                entry.advice_text,
                snapshot,
                entry.last_generated_at.as_ref().map(format_datetime),
                entry.alert_summary,
            ],
        )?;
        Ok(())
    }

    /// Set the alert summary without touching cached advice
    pub fn set_alert_summary(&self, user_id: &str, summary: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO advice_cache (user_id, alert_summary) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET alert_summary = excluded.alert_summary
            "#,
            params![user_id, summary],
        )?;
        Ok(())
    }
}
