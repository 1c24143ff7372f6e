//! Ledger operations

use rusqlite::{params, Row};

use super::{parse_date, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{is_valid_amount, NewTransaction, Transaction, TransactionType, MAX_AMOUNT_UNITS};
use crate::period::PeriodKey;

const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount, date, type, category, description, counterparty";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let amount: String = row.get(2)?;
    let date: String = row.get(3)?;
    let tx_type: String = row.get(4)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: parse_decimal(&amount, 2)?,
        date: parse_date(&date, 3)?,
        tx_type: tx_type.parse().unwrap_or(TransactionType::Expense),
        category: row.get(5)?,
        description: row.get(6)?,
        counterparty: row.get(7)?,
    })
}

/// First day of `period` as a stored date string
fn period_start(period: PeriodKey) -> String {
    format!("{}-01", period)
}

impl Database {
    /// Insert a ledger entry
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        if tx.amount.is_sign_negative() && !tx.amount.is_zero() {
            return Err(Error::Validation(format!(
                "Transaction amount must not be negative: {}",
                tx.amount
            )));
        }
        if !is_valid_amount(tx.amount) {
            return Err(Error::Validation(format!(
                "Transaction amount exceeds {}: {}",
                MAX_AMOUNT_UNITS, tx.amount
            )));
        }
        if tx.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id is required".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions (user_id, amount, date, type, category, description, counterparty)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.user_id,
                tx.amount.to_string(),
                tx.date.format("%Y-%m-%d").to_string(),
                tx.tx_type.as_str(),
                tx.category,
                tx.description,
                tx.counterparty,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Transactions for a user within one month, oldest first
    pub fn transactions_for_period(&self, user_id: &str, period: PeriodKey) -> Result<Vec<Transaction>> {
        self.transactions_between(user_id, period, period)
    }

    /// Transactions for a user from the start of `from` through the end of
    /// `to`, oldest first
    pub fn transactions_between(
        &self,
        user_id: &str,
        from: PeriodKey,
        to: PeriodKey,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND date >= ? AND date < ? ORDER BY date, id",
            TRANSACTION_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![user_id, period_start(from), period_start(to.next())],
            row_to_transaction,
        )?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    /// Most recent transactions for a user, newest first
    pub fn list_transactions(&self, user_id: &str, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY date DESC, id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        ))?;

        let rows = stmt.query_map(params![user_id, limit], row_to_transaction)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    /// Count ledger entries for a user
    pub fn count_transactions(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
