//! Domain models for Pesa

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::period::PeriodKey;

/// Direction of a ledger entry; amounts themselves are never negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "credit" => Ok(Self::Income),
            "expense" | "debit" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub category: String,
    pub description: String,
    pub counterparty: Option<String>,
}

/// A ledger entry about to be stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub category: String,
    pub description: String,
    pub counterparty: Option<String>,
}

/// Caller-supplied transaction with unvalidated fields
///
/// Records are converted with [`TransactionRecord::parse`]; records that fail
/// to parse are skipped by the aggregator rather than rejecting the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub date: String,
    pub amount: serde_json::Value,
    #[serde(rename = "type", default = "default_record_type")]
    pub tx_type: String,
    #[serde(default = "default_record_category")]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub counterparty: Option<String>,
}

fn default_record_type() -> String {
    "expense".to_string()
}

fn default_record_category() -> String {
    "Other".to_string()
}

impl TransactionRecord {
    /// Parse into a transaction, or None if any field is malformed
    pub fn parse(&self, user_id: &str) -> Option<Transaction> {
        let amount = parse_amount(&self.amount).filter(|a| is_valid_amount(*a))?;
        let date = parse_record_date(&self.date)?;
        let tx_type = self.tx_type.parse().ok()?;
        let id = match &self.id {
            Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        };

        Some(Transaction {
            id,
            user_id: user_id.to_string(),
            amount,
            date,
            tx_type,
            category: self.category.clone(),
            description: self.description.clone().unwrap_or_default(),
            counterparty: self.counterparty.clone().filter(|c| !c.is_empty()),
        })
    }
}

fn parse_amount(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Accepts plain dates and ISO-8601 timestamps
fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Lightweight view of a transaction used for alert-insight hashing
///
/// Field order is alphabetical so the serialized form is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub amount: Decimal,
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
}

impl From<&Transaction> for TransactionSummary {
    fn from(tx: &Transaction) -> Self {
        Self {
            amount: tx.amount.round_dp(2),
            category: tx.category.clone(),
            tx_type: tx.tx_type,
        }
    }
}

/// Per-period aggregate of a user's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub user_id: String,
    pub period_key: PeriodKey,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub savings: Decimal,
    /// Fraction of income saved (0.25 = 25%); 0 when there is no income
    pub savings_rate: f64,
    pub top_category: Option<String>,
    pub computed_at: DateTime<Utc>,
}

impl FinancialProfile {
    /// An all-zero profile for a user with no data in `period_key`
    pub fn empty(user_id: &str, period_key: PeriodKey) -> Self {
        Self {
            user_id: user_id.to_string(),
            period_key,
            total_income: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            savings: Decimal::ZERO,
            savings_rate: 0.0,
            top_category: None,
            computed_at: Utc::now(),
        }
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot::from(self)
    }
}

/// The comparable part of a profile
///
/// Stored alongside cached advice and returned to API callers. It omits
/// `computed_at` so identical ledgers hash identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub period_key: PeriodKey,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub savings: Decimal,
    pub savings_rate: f64,
    pub top_category: Option<String>,
}

impl ProfileSnapshot {
    /// SHA-256 of the snapshot's canonical JSON
    pub fn context_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        hex::encode(Sha256::digest(json.as_bytes()))
    }

    /// Savings rate as a percentage, for display
    pub fn savings_rate_percent(&self) -> f64 {
        self.savings_rate * 100.0
    }
}

impl From<&FinancialProfile> for ProfileSnapshot {
    fn from(p: &FinancialProfile) -> Self {
        Self {
            period_key: p.period_key,
            total_income: p.total_income,
            total_expenses: p.total_expenses,
            savings: p.savings,
            savings_rate: p.savings_rate,
            top_category: p.top_category.clone(),
        }
    }
}

/// Cached advice for a user, with the profile it was generated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceCacheEntry {
    pub user_id: String,
    pub context_hash: Option<String>,
    pub advice_text: Option<String>,
    pub last_profile_snapshot: Option<ProfileSnapshot>,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub alert_summary: Option<String>,
}

impl AdviceCacheEntry {
    /// Whether this entry holds usable advice (an entry may exist with only
    /// an alert summary)
    pub fn has_advice(&self) -> bool {
        self.advice_text.as_deref().is_some_and(|t| !t.is_empty())
            && self.last_generated_at.is_some()
    }
}

/// Cached explanation for an alert in a given transaction context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightCacheEntry {
    pub user_id: String,
    pub context_hash: String,
    pub alert_title: String,
    pub alert_message: String,
    pub transaction_summary: Vec<TransactionSummary>,
    pub response: String,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Critical => 3,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown alert severity: {}", s)),
        }
    }
}

/// Which rule produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Overspending,
    ExpensesExceedIncome,
    LowSavingsRate,
    SavingsMilestone,
    LargeTransaction,
    RisingTrend,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overspending => "overspending",
            Self::ExpensesExceedIncome => "expenses_exceed_income",
            Self::LowSavingsRate => "low_savings_rate",
            Self::SavingsMilestone => "savings_milestone",
            Self::LargeTransaction => "large_transaction",
            Self::RisingTrend => "rising_trend",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overspending" => Ok(Self::Overspending),
            "expenses_exceed_income" => Ok(Self::ExpensesExceedIncome),
            "low_savings_rate" => Ok(Self::LowSavingsRate),
            "savings_milestone" => Ok(Self::SavingsMilestone),
            "large_transaction" => Ok(Self::LargeTransaction),
            "rising_trend" => Ok(Self::RisingTrend),
            _ => Err(format!("Unknown alert kind: {}", s)),
        }
    }
}

/// An alert produced by the rule engine, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub user_id: String,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub category: String,
    pub severity: AlertSeverity,
}

/// A persisted alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: String,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub category: String,
    pub severity: AlertSeverity,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Format an amount with two decimals and thousands separators ("12,500.00")
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((&text, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac)
}

/// Largest single transaction amount accepted, in whole currency units
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000_000;

/// Whether `amount` is usable as a transaction amount: not negative and at
/// most [`MAX_AMOUNT_UNITS`]
pub fn is_valid_amount(amount: Decimal) -> bool {
    (!amount.is_sign_negative() || amount.is_zero()) && amount <= Decimal::from(MAX_AMOUNT_UNITS)
}

/// Lossy conversion used only for ratios and display
pub fn decimal_to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// `numerator / denominator` as a float
///
/// Uses exact division when the quotient fits in a `Decimal`, float division
/// otherwise. Callers guard against a zero denominator.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> f64 {
    match numerator.checked_div(denominator) {
        Some(quotient) => decimal_to_f64(quotient),
        None => decimal_to_f64(numerator) / decimal_to_f64(denominator),
    }
}
