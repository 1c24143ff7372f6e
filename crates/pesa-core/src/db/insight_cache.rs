//! Alert-insight cache rows keyed by (user_id, context_hash)

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{format_datetime, try_parse_datetime, Database};
use crate::error::Result;
use crate::models::InsightCacheEntry;

impl Database {
    /// Look up a cached alert explanation
    pub fn get_insight(&self, user_id: &str, context_hash: &str) -> Result<Option<InsightCacheEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                r#"
                SELECT user_id, context_hash, alert_title, alert_message, transaction_summary,
                       response, last_refreshed_at
                FROM insight_cache WHERE user_id = ? AND context_hash = ?
                "#,
                params![user_id, context_hash],
                |row| {
                    let summary: String = row.get(4)?;
                    let refreshed: String = row.get(6)?;
                    Ok(InsightCacheEntry {
                        user_id: row.get(0)?,
                        context_hash: row.get(1)?,
                        alert_title: row.get(2)?,
                        alert_message: row.get(3)?,
                        transaction_summary: serde_json::from_str(&summary).unwrap_or_default(),
                        response: row.get(5)?,
                        // An unreadable timestamp makes the entry as old as possible
                        last_refreshed_at: try_parse_datetime(&refreshed)
                            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Insert or refresh a cached alert explanation
    pub fn upsert_insight(&self, entry: &InsightCacheEntry) -> Result<()> {
        let summary = serde_json::to_string(&entry.transaction_summary)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO insight_cache
                (user_id, context_hash, alert_title, alert_message, transaction_summary, response, last_refreshed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, context_hash) DO UPDATE SET
                transaction_summary = excluded.transaction_summary,
                response = excluded.response,
                last_refreshed_at = excluded.last_refreshed_at
            "#,
            params![
                entry.user_id,
                entry.context_hash,
                entry.alert_title,
                entry.alert_message,
                summary,
                entry.response,
                format_datetime(&entry.last_refreshed_at),
            ],
        )?;
        Ok(())
    }
}
