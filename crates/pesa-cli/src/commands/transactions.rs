//! Transaction command implementations

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use pesa_core::db::Database;
use pesa_core::models::{format_amount, NewTransaction, TransactionType};
use rust_decimal::Decimal;

use super::truncate;

/// A transaction entered on the command line
pub struct NewEntry {
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub category: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub counterparty: Option<String>,
}

pub fn cmd_add(db: &Database, user: &str, entry: NewEntry) -> Result<()> {
    if entry.amount.is_sign_negative() {
        bail!("Amount must not be negative; use --type to record income or expense");
    }

    let tx = NewTransaction {
        user_id: user.to_string(),
        amount: entry.amount,
        date: entry.date.unwrap_or_else(|| Utc::now().date_naive()),
        tx_type: entry.tx_type,
        category: entry.category.trim().to_lowercase(),
        description: entry.description,
        counterparty: entry.counterparty,
    };
    let id = db.insert_transaction(&tx)?;

    println!(
        "✅ Recorded {} of {} ({}) on {} [id {}]",
        tx.tx_type,
        format_amount(tx.amount),
        tx.category,
        tx.date,
        id
    );

    Ok(())
}

pub fn cmd_transactions_list(db: &Database, user: &str, limit: i64) -> Result<()> {
    let transactions = db.list_transactions(user, limit)?;

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  pesa add 42.50 --category groceries");
        return Ok(());
    }

    let total = db.count_transactions(user)?;

    println!();
    println!("📝 Recent Transactions ({} of {})", transactions.len(), total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.tx_type {
            TransactionType::Expense => format!("\x1b[31m-{}\x1b[0m", format_amount(tx.amount)),
            TransactionType::Income => format!("\x1b[32m+{}\x1b[0m", format_amount(tx.amount)),
        };

        println!(
            "   {} │ {:>14} │ {:<14} │ {}",
            tx.date,
            amount_str,
            truncate(&tx.category, 14),
            truncate(&tx.description, 30)
        );
    }

    Ok(())
}
