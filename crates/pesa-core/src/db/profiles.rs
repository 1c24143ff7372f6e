//! Financial profile persistence

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{format_datetime, parse_datetime, parse_decimal, Database};
use crate::error::Result;
use crate::models::FinancialProfile;
use crate::period::PeriodKey;

const PROFILE_COLUMNS: &str = "user_id, period_key, total_income, total_expenses, savings, \
     savings_rate, top_category, computed_at";

fn row_to_profile(row: &Row) -> rusqlite::Result<FinancialProfile> {
    let period: String = row.get(1)?;
    let total_income: String = row.get(2)?;
    let total_expenses: String = row.get(3)?;
    let savings: String = row.get(4)?;
    let computed_at: String = row.get(7)?;

    Ok(FinancialProfile {
        user_id: row.get(0)?,
        period_key: period.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        total_income: parse_decimal(&total_income, 2)?,
        total_expenses: parse_decimal(&total_expenses, 3)?,
        savings: parse_decimal(&savings, 4)?,
        savings_rate: row.get(5)?,
        top_category: row.get(6)?,
        computed_at: parse_datetime(&computed_at),
    })
}

impl Database {
    /// Insert or replace the profile for (user, period)
    pub fn upsert_profile(&self, profile: &FinancialProfile) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO financial_profiles
                (user_id, period_key, total_income, total_expenses, savings, savings_rate, top_category, computed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, period_key) DO UPDATE SET
                total_income = excluded.total_income,
                total_expenses = excluded.total_expenses,
                savings = excluded.savings,
                savings_rate = excluded.savings_rate,
                top_category = excluded.top_category,
                computed_at = excluded.computed_at
            "#,
            params![
                profile.user_id,
                profile.period_key.to_string(),
                profile.total_income.to_string(),
                profile.total_expenses.to_string(),
                profile.savings.to_string(),
                profile.savings_rate,
                profile.top_category,
                format_datetime(&profile.computed_at),
            ],
        )?;
        debug!(user_id = %profile.user_id, period = %profile.period_key, "Profile upserted");
        Ok(())
    }

    /// Profile for one period
    pub fn get_profile(&self, user_id: &str, period: PeriodKey) -> Result<Option<FinancialProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                &format!(
                    "SELECT {} FROM financial_profiles WHERE user_id = ? AND period_key = ?",
                    PROFILE_COLUMNS
                ),
                params![user_id, period.to_string()],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Most recent profile by period
    pub fn latest_profile(&self, user_id: &str) -> Result<Option<FinancialProfile>> {
        Ok(self.list_profiles(user_id, 1)?.into_iter().next())
    }

    /// Profiles for a user, newest period first
    pub fn list_profiles(&self, user_id: &str, limit: i64) -> Result<Vec<FinancialProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM financial_profiles WHERE user_id = ? ORDER BY period_key DESC LIMIT ?",
            PROFILE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id, limit], row_to_profile)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }
}
