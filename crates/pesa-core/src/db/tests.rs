//! Database tests

use super::*;
use crate::error::Error;
use crate::models::*;
use crate::period::PeriodKey;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

fn new_tx(user: &str, date: &str, amount: i64, tx_type: TransactionType, category: &str) -> NewTransaction {
    NewTransaction {
        user_id: user.to_string(),
        amount: Decimal::from(amount),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        tx_type,
        category: category.to_string(),
        description: format!("{} {}", category, amount),
        counterparty: None,
    }
}

fn period(s: &str) -> PeriodKey {
    s.parse().unwrap()
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_transactions("u1", 10).unwrap().is_empty());
    assert!(db.get_cache_entry("u1").unwrap().is_none());
    assert!(db.latest_profile("u1").unwrap().is_none());
}

#[test]
fn test_schema_tables_exist() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('transactions', 'financial_profiles', 'advice_cache', 'alerts', 'insight_cache')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 5);
}

#[test]
fn test_transaction_period_queries() {
    let db = Database::in_memory().unwrap();
    db.insert_transaction(&new_tx("u1", "2025-01-31", 100, TransactionType::Expense, "Food"))
        .unwrap();
    db.insert_transaction(&new_tx("u1", "2025-02-01", 200, TransactionType::Expense, "Food"))
        .unwrap();
    db.insert_transaction(&new_tx("u1", "2025-02-28", 900, TransactionType::Income, "Salary"))
        .unwrap();
    db.insert_transaction(&new_tx("u2", "2025-02-10", 50, TransactionType::Expense, "Food"))
        .unwrap();

    let feb = db.transactions_for_period("u1", period("2025-02")).unwrap();
    assert_eq!(feb.len(), 2);
    assert_eq!(feb[0].amount, Decimal::from(200));
    assert_eq!(feb[1].tx_type, TransactionType::Income);

    let both = db
        .transactions_between("u1", period("2025-01"), period("2025-02"))
        .unwrap();
    assert_eq!(both.len(), 3);

    let latest = db.list_transactions("u1", 1).unwrap();
    assert_eq!(latest[0].date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    assert_eq!(db.count_transactions("u2").unwrap(), 1);
}

#[test]
fn test_decimal_amounts_round_trip_exactly() {
    let db = Database::in_memory().unwrap();
    let mut tx = new_tx("u1", "2025-03-03", 0, TransactionType::Expense, "Airtime");
    tx.amount = Decimal::new(1999, 2);
    db.insert_transaction(&tx).unwrap();

    let stored = db.list_transactions("u1", 1).unwrap();
    assert_eq!(stored[0].amount, Decimal::new(1999, 2));
}

#[test]
fn test_negative_transaction_rejected() {
    let db = Database::in_memory().unwrap();
    let tx = new_tx("u1", "2025-03-03", -5, TransactionType::Expense, "Food");
    assert!(matches!(
        db.insert_transaction(&tx),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_oversized_transaction_rejected() {
    let db = Database::in_memory().unwrap();
    let mut tx = new_tx("u1", "2025-03-03", 1, TransactionType::Expense, "Food");
    tx.amount = Decimal::MAX;
    assert!(matches!(
        db.insert_transaction(&tx),
        Err(Error::Validation(_))
    ));
    assert_eq!(db.count_transactions("u1").unwrap(), 0);
}

#[test]
fn test_profile_upsert_and_latest() {
    let db = Database::in_memory().unwrap();
    let mut jan = FinancialProfile::empty("u1", period("2025-01"));
    jan.total_income = Decimal::from(1000);
    db.upsert_profile(&jan).unwrap();

    let mut feb = FinancialProfile::empty("u1", period("2025-02"));
    feb.total_expenses = Decimal::from(400);
    feb.top_category = Some("Rent".to_string());
    db.upsert_profile(&feb).unwrap();

    // Upserting the same period replaces it
    feb.total_expenses = Decimal::from(450);
    db.upsert_profile(&feb).unwrap();

    let latest = db.latest_profile("u1").unwrap().unwrap();
    assert_eq!(latest.period_key, period("2025-02"));
    assert_eq!(latest.total_expenses, Decimal::from(450));
    assert_eq!(latest.top_category.as_deref(), Some("Rent"));

    let stored_jan = db.get_profile("u1", period("2025-01")).unwrap().unwrap();
    assert_eq!(stored_jan.total_income, Decimal::from(1000));
    assert_eq!(db.list_profiles("u1", 10).unwrap().len(), 2);
}

#[test]
fn test_cache_entry_upsert_keeps_snapshot_and_timestamp_together() {
    let db = Database::in_memory().unwrap();
    let profile = FinancialProfile::empty("u1", period("2025-01"));
    let snapshot = profile.snapshot();
    let generated_at = Utc::now() - Duration::days(2);

    let entry = AdviceCacheEntry {
        user_id: "u1".to_string(),
        context_hash: Some(snapshot.context_hash()),
        advice_text: Some("Track your spending".to_string()),
        last_profile_snapshot: Some(snapshot.clone()),
        last_generated_at: Some(generated_at),
        alert_summary: None,
    };
    db.upsert_cache_entry(&entry).unwrap();

    let stored = db.get_cache_entry("u1").unwrap().unwrap();
    assert_eq!(stored.advice_text.as_deref(), Some("Track your spending"));
    assert_eq!(stored.last_profile_snapshot, Some(snapshot));
    assert_eq!(
        stored.last_generated_at.unwrap().timestamp(),
        generated_at.timestamp()
    );
}

#[test]
fn test_unreadable_generation_time_reads_as_missing() {
    let db = Database::in_memory().unwrap();
    let snapshot = FinancialProfile::empty("u1", period("2025-01")).snapshot();
    db.upsert_cache_entry(&AdviceCacheEntry {
        user_id: "u1".to_string(),
        context_hash: Some(snapshot.context_hash()),
        advice_text: Some("Track your spending".to_string()),
        last_profile_snapshot: Some(snapshot.clone()),
        last_generated_at: Some(Utc::now()),
        alert_summary: None,
    })
    .unwrap();

    db.conn()
        .unwrap()
        .execute(
            "UPDATE advice_cache SET last_generated_at = 'last tuesday' WHERE user_id = 'u1'",
            [],
        )
        .unwrap();

    let stored = db.get_cache_entry("u1").unwrap().unwrap();
    assert!(stored.last_generated_at.is_none());
    assert_eq!(
        crate::advisor::StalenessPolicy::default().evaluate(Some(&stored), &snapshot, Utc::now()),
        crate::advisor::CacheState::StaleByTime
    );
}

#[test]
fn test_alert_summary_does_not_touch_advice() {
    let db = Database::in_memory().unwrap();

    // Summary before any advice creates a bare row
    db.set_alert_summary("u1", "High spending").unwrap();
    let entry = db.get_cache_entry("u1").unwrap().unwrap();
    assert!(!entry.has_advice());
    assert_eq!(entry.alert_summary.as_deref(), Some("High spending"));

    let generated_at = Utc::now();
    db.upsert_cache_entry(&AdviceCacheEntry {
        user_id: "u1".to_string(),
        context_hash: None,
        advice_text: Some("Cut dining".to_string()),
        last_profile_snapshot: None,
        last_generated_at: Some(generated_at),
        alert_summary: None,
    })
    .unwrap();

    // Regeneration keeps the summary
    let entry = db.get_cache_entry("u1").unwrap().unwrap();
    assert_eq!(entry.alert_summary.as_deref(), Some("High spending"));

    db.set_alert_summary("u1", "Large transaction").unwrap();
    let entry = db.get_cache_entry("u1").unwrap().unwrap();
    assert_eq!(entry.advice_text.as_deref(), Some("Cut dining"));
    assert_eq!(
        entry.last_generated_at.unwrap().timestamp(),
        generated_at.timestamp()
    );
    assert_eq!(entry.alert_summary.as_deref(), Some("Large transaction"));
}

#[test]
fn test_alert_batch_and_read_flag() {
    let db = Database::in_memory().unwrap();
    let batch = vec![
        NewAlert {
            user_id: "u1".to_string(),
            kind: AlertKind::Overspending,
            title: "High spending".to_string(),
            message: "You spent KES 900.00".to_string(),
            category: "spending".to_string(),
            severity: AlertSeverity::Warning,
        },
        NewAlert {
            user_id: "u1".to_string(),
            kind: AlertKind::LargeTransaction,
            title: "Large transaction".to_string(),
            message: "KES 6,000.00 on Rent".to_string(),
            category: "transaction".to_string(),
            severity: AlertSeverity::Info,
        },
    ];

    let stored = db.insert_alerts(&batch).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].id < stored[1].id);

    assert!(db.mark_alert_read(stored[0].id).unwrap());
    assert!(!db.mark_alert_read(9999).unwrap());

    let unread = db.list_alerts("u1", true).unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].kind, AlertKind::LargeTransaction);

    let alert = db.get_alert(stored[0].id).unwrap().unwrap();
    assert!(alert.is_read);
    assert_eq!(alert.severity, AlertSeverity::Warning);
    assert!(db.get_alert(9999).unwrap().is_none());
}

#[test]
fn test_insight_cache_upsert() {
    let db = Database::in_memory().unwrap();
    let mut entry = InsightCacheEntry {
        user_id: "u1".to_string(),
        context_hash: "abc".to_string(),
        alert_title: "High spending".to_string(),
        alert_message: "msg".to_string(),
        transaction_summary: vec![TransactionSummary {
            amount: Decimal::new(1050, 2),
            category: "Food".to_string(),
            tx_type: TransactionType::Expense,
        }],
        response: "Cook at home.".to_string(),
        last_refreshed_at: Utc::now(),
    };
    db.upsert_insight(&entry).unwrap();

    entry.response = "Plan meals weekly.".to_string();
    db.upsert_insight(&entry).unwrap();

    let stored = db.get_insight("u1", "abc").unwrap().unwrap();
    assert_eq!(stored.response, "Plan meals weekly.");
    assert_eq!(stored.transaction_summary, entry.transaction_summary);
    assert!(db.get_insight("u2", "abc").unwrap().is_none());

    db.conn()
        .unwrap()
        .execute("UPDATE insight_cache SET last_refreshed_at = 'soon'", [])
        .unwrap();
    let stored = db.get_insight("u1", "abc").unwrap().unwrap();
    assert_eq!(stored.last_refreshed_at, chrono::DateTime::<Utc>::UNIX_EPOCH);
}

#[test]
fn test_derive_key_is_deterministic() {
    let a = derive_key("correct horse").unwrap();
    let b = derive_key("correct horse").unwrap();
    let c = derive_key("battery staple").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}
