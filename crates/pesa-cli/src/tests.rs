//! CLI command tests

use std::io::Write;

use chrono::{Datelike, NaiveDate, Utc};
use pesa_core::db::Database;
use pesa_core::models::TransactionType;
use pesa_core::PeriodKey;
use rust_decimal::Decimal;

use crate::commands::{self, truncate, NewEntry};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn entry(amount: i64, tx_type: TransactionType, category: &str) -> NewEntry {
    NewEntry {
        amount: Decimal::from(amount),
        tx_type,
        category: category.to_string(),
        description: format!("{} entry", category),
        date: None,
        counterparty: None,
    }
}

// ========== Transaction Command Tests ==========

#[test]
fn test_cmd_add_defaults_to_today() {
    let db = setup_test_db();
    commands::cmd_add(&db, "u1", entry(42, TransactionType::Expense, "Groceries")).unwrap();

    let txs = db.list_transactions("u1", 10).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].date, Utc::now().date_naive());
    assert_eq!(txs[0].category, "groceries");
    assert_eq!(txs[0].amount, Decimal::from(42));
}

#[test]
fn test_cmd_add_with_date() {
    let db = setup_test_db();
    let mut e = entry(2500, TransactionType::Income, "salary");
    e.date = NaiveDate::from_ymd_opt(2025, 3, 1);
    commands::cmd_add(&db, "u1", e).unwrap();

    let period = PeriodKey::new(2025, 3).unwrap();
    let txs = db.transactions_for_period("u1", period).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].tx_type, TransactionType::Income);
}

#[test]
fn test_cmd_add_rejects_negative_amount() {
    let db = setup_test_db();
    let result = commands::cmd_add(&db, "u1", entry(-5, TransactionType::Expense, "misc"));
    assert!(result.is_err());
    assert_eq!(db.count_transactions("u1").unwrap(), 0);
}

#[test]
fn test_cmd_transactions_list() {
    let db = setup_test_db();
    assert!(commands::cmd_transactions_list(&db, "u1", 10).is_ok());

    commands::cmd_add(&db, "u1", entry(10, TransactionType::Expense, "coffee")).unwrap();
    assert!(commands::cmd_transactions_list(&db, "u1", 10).is_ok());
}

// ========== Advisor Command Tests ==========

#[test]
fn test_cmd_profile_stores_profile() {
    let db = setup_test_db();
    commands::cmd_add(&db, "u1", entry(3000, TransactionType::Income, "salary")).unwrap();
    commands::cmd_add(&db, "u1", entry(900, TransactionType::Expense, "rent")).unwrap();

    commands::cmd_profile(&db, "u1", None).unwrap();

    let profile = db
        .get_profile("u1", PeriodKey::current())
        .unwrap()
        .unwrap();
    assert_eq!(profile.total_income, Decimal::from(3000));
    assert_eq!(profile.total_expenses, Decimal::from(900));
    assert_eq!(profile.top_category.as_deref(), Some("rent"));
}

#[tokio::test]
async fn test_cmd_advice_without_data() {
    let db = setup_test_db();
    assert!(commands::cmd_advice(&db, "nobody", None, false).await.is_ok());
    assert!(db.get_profile("nobody", PeriodKey::current()).unwrap().is_none());
}

#[tokio::test]
async fn test_cmd_advice_json() {
    let db = setup_test_db();
    commands::cmd_add(&db, "u1", entry(3000, TransactionType::Income, "salary")).unwrap();

    assert!(commands::cmd_advice(&db, "u1", None, true).await.is_ok());
    assert!(db.get_profile("u1", PeriodKey::current()).unwrap().is_some());
}

#[test]
fn test_cmd_insights_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let records = serde_json::json!([
        { "date": "2025-01-05", "amount": 4000, "type": "income", "category": "salary" },
        { "date": "2025-01-09", "amount": "1200.50", "type": "expense", "category": "rent" },
        { "date": "bad", "amount": 10, "type": "expense" }
    ]);
    write!(file, "{}", records).unwrap();

    assert!(commands::cmd_insights("u1", file.path(), Some(Decimal::from(5000)), false).is_ok());
    assert!(commands::cmd_insights("u1", file.path(), None, true).is_ok());
}

#[test]
fn test_cmd_insights_rejects_invalid_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    assert!(commands::cmd_insights("u1", file.path(), None, false).is_err());
}

#[test]
fn test_cmd_health() {
    let db = setup_test_db();
    assert!(commands::cmd_health(&db, "u1").is_ok());

    commands::cmd_add(&db, "u1", entry(3000, TransactionType::Income, "salary")).unwrap();
    assert!(commands::cmd_health(&db, "u1").is_ok());
}

// ========== Alert Command Tests ==========

#[test]
fn test_cmd_alerts_generate_and_read() {
    let db = setup_test_db();
    commands::cmd_add(&db, "u1", entry(1000, TransactionType::Income, "salary")).unwrap();
    commands::cmd_add(&db, "u1", entry(1800, TransactionType::Expense, "travel")).unwrap();

    commands::cmd_alerts_generate(&db, "u1").unwrap();
    let alerts = db.list_alerts("u1", true).unwrap();
    assert!(!alerts.is_empty());

    commands::cmd_alerts_read(&db, alerts[0].id).unwrap();
    assert_eq!(db.list_alerts("u1", true).unwrap().len(), alerts.len() - 1);
    assert!(commands::cmd_alerts_list(&db, "u1", false).is_ok());
}

#[test]
fn test_cmd_alerts_read_missing() {
    let db = setup_test_db();
    assert!(commands::cmd_alerts_read(&db, 404).is_err());
}

#[tokio::test]
async fn test_cmd_alerts_explain_other_user() {
    let db = setup_test_db();
    commands::cmd_add(&db, "u1", entry(1000, TransactionType::Income, "salary")).unwrap();
    commands::cmd_add(&db, "u1", entry(1800, TransactionType::Expense, "travel")).unwrap();
    commands::cmd_alerts_generate(&db, "u1").unwrap();
    let id = db.list_alerts("u1", false).unwrap()[0].id;

    assert!(commands::cmd_alerts_explain(&db, "u2", id).await.is_err());
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer description", 10), "a longe...");
    assert_eq!(truncate("ñandú café", 6), "ñan...");
}

#[test]
fn test_period_argument_parsing() {
    let period: PeriodKey = "2025-02".parse().unwrap();
    assert_eq!(period.month(), 2);
    assert!("2025-13".parse::<PeriodKey>().is_err());

    let today = Utc::now().date_naive();
    assert_eq!(PeriodKey::current().month(), today.month());
}
