//! Financial health score

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregate::accumulate;
use crate::models::{is_valid_amount, ratio, Transaction, TransactionType};
use crate::period::PeriodKey;

/// Months of history the health score covers
pub const HEALTH_WINDOW_MONTHS: u32 = 3;

const BASE_SCORE: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl HealthLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => HealthLevel::Excellent,
            60..=79 => HealthLevel::Good,
            40..=59 => HealthLevel::Fair,
            _ => HealthLevel::NeedsAttention,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Excellent => "excellent",
            HealthLevel::Good => "good",
            HealthLevel::Fair => "fair",
            HealthLevel::NeedsAttention => "needs_attention",
        }
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub score: u8,
    pub level: HealthLevel,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub savings: Decimal,
    /// Percent, one decimal
    pub savings_rate: f64,
    /// Expenses as a percent of income, one decimal; 100 with no income
    pub expense_ratio: f64,
}

/// Score income and expenses on a 0-100 scale
pub fn health_score(total_income: Decimal, total_expenses: Decimal) -> HealthReport {
    let savings = total_income - total_expenses;
    let (savings_rate, expense_ratio) = if total_income > Decimal::ZERO {
        (
            ratio(savings, total_income) * 100.0,
            ratio(total_expenses, total_income) * 100.0,
        )
    } else {
        (0.0, 100.0)
    };

    let savings_bonus = if savings_rate > 20.0 {
        30
    } else if savings_rate > 10.0 {
        20
    } else if savings_rate > 5.0 {
        10
    } else if savings_rate > 0.0 {
        5
    } else {
        0
    };

    let expense_bonus = if expense_ratio < 60.0 {
        20
    } else if expense_ratio < 80.0 {
        10
    } else if expense_ratio < 100.0 {
        5
    } else {
        0
    };

    let score = (BASE_SCORE + savings_bonus + expense_bonus).clamp(0, 100) as u8;

    HealthReport {
        score,
        level: HealthLevel::from_score(score),
        total_income,
        total_expenses,
        savings,
        savings_rate: (savings_rate * 10.0).round() / 10.0,
        expense_ratio: (expense_ratio * 10.0).round() / 10.0,
    }
}

/// First month of the health window ending at `through`
pub fn window_start(through: PeriodKey) -> PeriodKey {
    (1..HEALTH_WINDOW_MONTHS).fold(through, |month, _| month.previous())
}

/// Score a set of transactions by their income and expense totals
pub fn health_from_transactions(transactions: &[Transaction]) -> HealthReport {
    let (income, expenses) = transactions
        .iter()
        .filter(|tx| is_valid_amount(tx.amount))
        .fold((Decimal::ZERO, Decimal::ZERO), |(mut inc, mut exp), tx| {
            match tx.tx_type {
                TransactionType::Income => accumulate(&mut inc, tx.amount),
                TransactionType::Expense => accumulate(&mut exp, tx.amount),
            };
            (inc, exp)
        });
    health_score(income, expenses)
}
