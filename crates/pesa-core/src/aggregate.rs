//! Transaction aggregation
//!
//! Reduces a ledger into a [`FinancialProfile`] for one period. Aggregation is
//! pure: it never fails, and malformed entries are skipped and counted. Sums
//! are checked; an entry that would overflow a total is skipped like a
//! malformed one.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::models::{
    is_valid_amount, ratio, FinancialProfile, Transaction, TransactionRecord, TransactionType,
};
use crate::period::PeriodKey;

/// Result of aggregating a ledger for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub profile: FinancialProfile,
    /// Entries in the period that were ignored as malformed
    pub skipped: usize,
    /// Expense totals per category in the period
    pub category_totals: BTreeMap<String, Decimal>,
}

/// Income and expense totals for one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthTotals {
    pub income: Decimal,
    pub expenses: Decimal,
}

/// Aggregate `transactions` falling in `period` into a profile
pub fn aggregate(user_id: &str, transactions: &[Transaction], period: PeriodKey) -> Aggregation {
    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    let mut category_totals: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut skipped = 0;

    for tx in transactions.iter().filter(|tx| period.contains(tx.date)) {
        if !is_valid_amount(tx.amount) {
            skipped += 1;
            continue;
        }
        let added = match tx.tx_type {
            TransactionType::Income => accumulate(&mut total_income, tx.amount),
            TransactionType::Expense => {
                let category = category_totals.get(&tx.category).copied().unwrap_or_default();
                match (
                    total_expenses.checked_add(tx.amount),
                    category.checked_add(tx.amount),
                ) {
                    (Some(total), Some(category)) => {
                        total_expenses = total;
                        category_totals.insert(tx.category.clone(), category);
                        true
                    }
                    _ => false,
                }
            }
        };
        if !added {
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!(user_id, skipped, period = %period, "Skipped malformed transactions");
    }

    let savings = total_income - total_expenses;
    let savings_rate = savings_rate(savings, total_income);

    Aggregation {
        profile: FinancialProfile {
            user_id: user_id.to_string(),
            period_key: period,
            total_income,
            total_expenses,
            savings,
            savings_rate,
            top_category: top_category(&category_totals),
            computed_at: Utc::now(),
        },
        skipped,
        category_totals,
    }
}

/// Convert raw records into transactions, returning the count of records skipped
pub fn parse_records(user_id: &str, records: &[TransactionRecord]) -> (Vec<Transaction>, usize) {
    let transactions: Vec<Transaction> = records.iter().filter_map(|r| r.parse(user_id)).collect();
    let skipped = records.len() - transactions.len();
    if skipped > 0 {
        warn!(user_id, skipped, "Skipped malformed transaction records");
    }
    (transactions, skipped)
}

/// Per-month income and expense totals, oldest month first
pub fn monthly_totals(transactions: &[Transaction]) -> BTreeMap<PeriodKey, MonthTotals> {
    let mut months: BTreeMap<PeriodKey, MonthTotals> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| is_valid_amount(tx.amount)) {
        let totals = months.entry(PeriodKey::from_date(tx.date)).or_default();
        match tx.tx_type {
            TransactionType::Income => accumulate(&mut totals.income, tx.amount),
            TransactionType::Expense => accumulate(&mut totals.expenses, tx.amount),
        };
    }
    months
}

/// Per-month expense totals for each category
pub fn monthly_category_totals(
    transactions: &[Transaction],
) -> BTreeMap<String, BTreeMap<PeriodKey, Decimal>> {
    let mut out: BTreeMap<String, BTreeMap<PeriodKey, Decimal>> = BTreeMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.tx_type == TransactionType::Expense && is_valid_amount(tx.amount))
    {
        let total = out
            .entry(tx.category.clone())
            .or_default()
            .entry(PeriodKey::from_date(tx.date))
            .or_default();
        accumulate(total, tx.amount);
    }
    out
}

/// Add `amount` to `total`; on overflow leave `total` unchanged and return false
pub(crate) fn accumulate(total: &mut Decimal, amount: Decimal) -> bool {
    match total.checked_add(amount) {
        Some(sum) => {
            *total = sum;
            true
        }
        None => false,
    }
}

fn savings_rate(savings: Decimal, income: Decimal) -> f64 {
    if income.is_zero() {
        return 0.0;
    }
    ratio(savings, income)
}

// Map iteration is ascending, so keeping the first maximum breaks ties by name
fn top_category(category_totals: &BTreeMap<String, Decimal>) -> Option<String> {
    let mut best: Option<(&String, Decimal)> = None;
    for (category, total) in category_totals {
        if best.map_or(true, |(_, b)| *total > b) {
            best = Some((category, *total));
        }
    }
    best.map(|(c, _)| c.clone())
}
