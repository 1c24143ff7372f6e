//! Alert operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::{Alert, AlertKind, AlertSeverity, NewAlert};

const ALERT_COLUMNS: &str = "id, user_id, kind, title, message, category, severity, is_read, created_at";

fn row_to_alert(row: &Row) -> rusqlite::Result<Alert> {
    let kind: String = row.get(2)?;
    let severity: String = row.get(6)?;
    let created_at: String = row.get(8)?;

    Ok(Alert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: kind.parse().unwrap_or(AlertKind::Overspending),
        title: row.get(3)?,
        message: row.get(4)?,
        category: row.get(5)?,
        severity: severity.parse().unwrap_or(AlertSeverity::Info),
        is_read: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Persist a batch of alerts atomically, returning them with ids
    pub fn insert_alerts(&self, alerts: &[NewAlert]) -> Result<Vec<Alert>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let created_at = format_datetime(&now);

        let mut stored = Vec::with_capacity(alerts.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO alerts (user_id, kind, title, message, category, severity, is_read, created_at)
                VALUES (?, ?, ?, ?, ?, ?, FALSE, ?)
                "#,
            )?;

            for alert in alerts {
                stmt.execute(params![
                    alert.user_id,
                    alert.kind.as_str(),
                    alert.title,
                    alert.message,
                    alert.category,
                    alert.severity.as_str(),
                    created_at,
                ])?;
                stored.push(Alert {
                    id: tx.last_insert_rowid(),
                    user_id: alert.user_id.clone(),
                    kind: alert.kind,
                    title: alert.title.clone(),
                    message: alert.message.clone(),
                    category: alert.category.clone(),
                    severity: alert.severity,
                    is_read: false,
                    created_at: parse_datetime(&created_at),
                });
            }
        }
        tx.commit()?;

        Ok(stored)
    }

    /// List alerts for a user, newest first
    pub fn list_alerts(&self, user_id: &str, unread_only: bool) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM alerts WHERE user_id = ? {} ORDER BY created_at DESC, id DESC",
            ALERT_COLUMNS,
            if unread_only { "AND is_read = FALSE" } else { "" }
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_alert)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    /// Get an alert by id
    pub fn get_alert(&self, id: i64) -> Result<Option<Alert>> {
        let conn = self.conn()?;
        let alert = conn
            .query_row(
                &format!("SELECT {} FROM alerts WHERE id = ?", ALERT_COLUMNS),
                params![id],
                row_to_alert,
            )
            .optional()?;
        Ok(alert)
    }

    /// Mark an alert as read; returns false if no such alert exists
    pub fn mark_alert_read(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute("UPDATE alerts SET is_read = TRUE WHERE id = ?", params![id])?;
        Ok(updated > 0)
    }
}
