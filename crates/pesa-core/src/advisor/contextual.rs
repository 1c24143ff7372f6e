//! Contextual insights over caller-supplied transactions
//!
//! Unlike cached advice, these are computed fresh on every call and never
//! touch storage or the generator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregate::{
    accumulate, aggregate, monthly_category_totals, monthly_totals, parse_records,
};
use crate::error::{Error, Result};
use crate::models::{
    decimal_to_f64, format_amount, is_valid_amount, ratio, ProfileSnapshot, Transaction, TransactionRecord,
    TransactionType,
};
use crate::period::PeriodKey;

use super::fallback::advice_for_savings_rate;

/// Month-over-month change that counts as a trend
const TREND_THRESHOLD: f64 = 0.10;
/// Coefficient of variation above which income is irregular
const IRREGULAR_INCOME_CV: f64 = 0.3;
/// Rising months needed before a streak is reported
const STREAK_ALERT_MONTHS: usize = 2;
const TOP_CATEGORIES: usize = 3;

const NO_DATA_ADVICE: &str = "No recent transactions provided. Start tracking your expenses to \
get personalized financial advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    Success,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl SpendingTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpendingTrend::Increasing => "increasing",
            SpendingTrend::Decreasing => "decreasing",
            SpendingTrend::Stable => "stable",
        }
    }

    fn from_change(change: f64) -> Self {
        if change > TREND_THRESHOLD {
            SpendingTrend::Increasing
        } else if change < -TREND_THRESHOLD {
            SpendingTrend::Decreasing
        } else {
            SpendingTrend::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

/// Numbers behind the insight messages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightMetrics {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub savings: Decimal,
    /// Percent of income saved, one decimal
    pub savings_rate: f64,
    pub avg_monthly_expense: Decimal,
    pub trend: SpendingTrend,
    /// Latest month-over-month expense change in percent
    pub growth_rate: f64,
    pub overspending_streak: usize,
    pub irregular_income: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub metrics: InsightMetrics,
    pub top_categories: Vec<CategoryTotal>,
    pub monthly_expenses: BTreeMap<PeriodKey, Decimal>,
    pub monthly_income: BTreeMap<PeriodKey, Decimal>,
    pub spending_overview: String,
    pub trend_analysis: String,
    pub savings_analysis: String,
    pub goal_projection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_alert: Option<String>,
    pub income_stability: String,
    pub category_trends: Vec<String>,
    pub alerts: Vec<String>,
}

/// Response for a contextual insights request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualInsights {
    pub status: InsightStatus,
    pub contextual_advice: String,
    pub insights: Option<InsightReport>,
    /// Profile of the most recent month in the records
    pub profile: Option<ProfileSnapshot>,
    pub skipped: usize,
    pub fresh: bool,
    pub generated_at: DateTime<Utc>,
}

/// Analyze `records` for `user_id`
///
/// An empty list yields `status = no_data`. A non-empty list in which every
/// record is malformed is rejected.
pub fn contextual_insights(
    user_id: &str,
    records: &[TransactionRecord],
    savings_goal: Option<Decimal>,
    currency: &str,
) -> Result<ContextualInsights> {
    if records.is_empty() {
        return Ok(ContextualInsights {
            status: InsightStatus::NoData,
            contextual_advice: NO_DATA_ADVICE.to_string(),
            insights: None,
            profile: None,
            skipped: 0,
            fresh: false,
            generated_at: Utc::now(),
        });
    }

    let (transactions, skipped) = parse_records(user_id, records);
    if transactions.is_empty() {
        return Err(Error::Validation(format!(
            "all {} transaction records are malformed",
            records.len()
        )));
    }

    let report = analyze(&transactions, savings_goal, currency);
    let latest = transactions
        .iter()
        .map(|tx| PeriodKey::from_date(tx.date))
        .max()
        .unwrap_or_else(PeriodKey::current);
    let profile = aggregate(user_id, &transactions, latest).profile.snapshot();

    Ok(ContextualInsights {
        status: InsightStatus::Success,
        contextual_advice: advice_for_savings_rate(report.metrics.savings_rate / 100.0).to_string(),
        insights: Some(report),
        profile: Some(profile),
        skipped,
        fresh: true,
        generated_at: Utc::now(),
    })
}

/// Compute metrics and messages over well-formed transactions
pub fn analyze(
    transactions: &[Transaction],
    savings_goal: Option<Decimal>,
    currency: &str,
) -> InsightReport {
    let money = |amount: Decimal| format!("{} {}", currency, format_amount(amount));

    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    let mut by_category: BTreeMap<&str, Decimal> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| is_valid_amount(tx.amount)) {
        match tx.tx_type {
            TransactionType::Income => {
                accumulate(&mut total_income, tx.amount);
            }
            TransactionType::Expense => {
                let category = by_category.get(tx.category.as_str()).copied().unwrap_or_default();
                if let (Some(total), Some(category)) = (
                    total_expenses.checked_add(tx.amount),
                    category.checked_add(tx.amount),
                ) {
                    total_expenses = total;
                    by_category.insert(tx.category.as_str(), category);
                }
            }
        }
    }
    let savings = total_income - total_expenses;
    let savings_rate = if total_income > Decimal::ZERO {
        round1(ratio(savings, total_income) * 100.0)
    } else {
        0.0
    };

    let mut top: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount,
        })
        .collect();
    // Stable sort keeps name order among equal amounts
    top.sort_by(|a, b| b.amount.cmp(&a.amount));
    top.truncate(TOP_CATEGORIES);

    let months = monthly_totals(transactions);
    let monthly_expenses: BTreeMap<PeriodKey, Decimal> = months
        .iter()
        .filter(|(_, t)| t.expenses > Decimal::ZERO)
        .map(|(k, t)| (*k, t.expenses))
        .collect();
    let monthly_income: BTreeMap<PeriodKey, Decimal> = months
        .iter()
        .filter(|(_, t)| t.income > Decimal::ZERO)
        .map(|(k, t)| (*k, t.income))
        .collect();

    let expense_values: Vec<Decimal> = monthly_expenses.values().copied().collect();
    let avg_monthly_expense = if expense_values.is_empty() {
        Decimal::ZERO
    } else {
        let n = Decimal::from(expense_values.len());
        let mut total = Decimal::ZERO;
        for value in &expense_values {
            accumulate(&mut total, *value / n);
        }
        total.round_dp(2)
    };

    let (trend, growth_rate) = match expense_values.as_slice() {
        [.., prev, curr] if *prev > Decimal::ZERO => {
            let change = ratio(*curr - *prev, *prev);
            (SpendingTrend::from_change(change), round1(change * 100.0))
        }
        _ => (SpendingTrend::Stable, 0.0),
    };

    let overspending_streak = expense_values
        .windows(2)
        .rev()
        .take_while(|w| w[1] > w[0])
        .count();

    let income_values: Vec<f64> = monthly_income.values().map(|v| decimal_to_f64(*v)).collect();
    let irregular_income = coefficient_of_variation(&income_values)
        .is_some_and(|cv| cv > IRREGULAR_INCOME_CV);

    let goal_projection = goal_projection(savings_goal, savings, savings_rate, avg_monthly_expense);

    let streak_alert = (overspending_streak >= STREAK_ALERT_MONTHS).then(|| {
        format!(
            "You've had {} consecutive months of rising expenses.",
            overspending_streak
        )
    });

    let mut alerts = Vec::new();
    if savings_rate < 10.0 {
        alerts.push("Low savings rate: consider automating monthly transfers.".to_string());
    }
    if total_expenses > total_income {
        alerts.push("Expenses exceed income: review budget allocations.".to_string());
    }
    if overspending_streak >= STREAK_ALERT_MONTHS {
        alerts.push("Continuous spending increase detected.".to_string());
    }

    let top_list = top
        .iter()
        .map(|c| format!("{} ({})", c.category, money(c.amount)))
        .collect::<Vec<_>>()
        .join(", ");

    InsightReport {
        spending_overview: format!(
            "You've spent {}. Top categories: {}. Avg monthly expense: {}.",
            money(total_expenses),
            if top_list.is_empty() { "none" } else { top_list.as_str() },
            money(avg_monthly_expense)
        ),
        trend_analysis: format!(
            "Spending trend: {}. Month-over-month change: {:+.1}%.",
            trend.as_str(),
            growth_rate
        ),
        savings_analysis: format!(
            "Savings: {} ({:.1}% of income).",
            money(savings),
            savings_rate
        ),
        goal_projection,
        streak_alert,
        income_stability: if irregular_income {
            "Income appears irregular, plan a buffer for low months.".to_string()
        } else {
            "Income appears stable.".to_string()
        },
        category_trends: category_trends(transactions),
        alerts,
        metrics: InsightMetrics {
            total_income,
            total_expenses,
            savings,
            savings_rate,
            avg_monthly_expense,
            trend,
            growth_rate,
            overspending_streak,
            irregular_income,
        },
        top_categories: top,
        monthly_expenses,
        monthly_income,
    }
}

fn goal_projection(
    goal: Option<Decimal>,
    savings: Decimal,
    savings_rate: f64,
    avg_monthly_expense: Decimal,
) -> String {
    let unavailable = || "Goal projection unavailable.".to_string();
    let Some(goal) = goal.filter(|g| *g > Decimal::ZERO) else {
        return unavailable();
    };
    if savings <= Decimal::ZERO {
        return unavailable();
    }
    if savings >= goal {
        return "Savings goal already reached.".to_string();
    }

    let monthly_savings = savings_rate / 100.0 * decimal_to_f64(avg_monthly_expense);
    if monthly_savings <= 0.0 {
        return unavailable();
    }
    let months = decimal_to_f64(goal - savings) / monthly_savings;
    format!("Approx. {:.1} months to reach goal.", months)
}

/// Population standard deviation over mean; None for fewer than two values
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

/// One message per expense category with at least two months of data
fn category_trends(transactions: &[Transaction]) -> Vec<String> {
    monthly_category_totals(transactions)
        .into_iter()
        .filter_map(|(category, months)| {
            let values: Vec<Decimal> = months.into_values().collect();
            let [.., prev, curr] = values.as_slice() else {
                return None;
            };
            if prev.is_zero() {
                return None;
            }
            let change = ratio(*curr - *prev, *prev) * 100.0;
            Some(if change > TREND_THRESHOLD * 100.0 {
                format!(
                    "Your spending in {} increased by {:.1}% this month.",
                    category, change
                )
            } else if change < -TREND_THRESHOLD * 100.0 {
                format!(
                    "You reduced spending in {} by {:.1}%, great job!",
                    category,
                    change.abs()
                )
            } else {
                format!("Your spending in {} is stable.", category)
            })
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(date: &str, amount: f64, tx_type: &str, category: &str) -> TransactionRecord {
        serde_json::from_value(json!({
            "date": date,
            "amount": amount,
            "type": tx_type,
            "category": category,
        }))
        .unwrap()
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            record("2025-01-01", 10000.0, "income", "Salary"),
            record("2025-01-10", 4000.0, "expense", "Food"),
            record("2025-02-01", 10000.0, "income", "Salary"),
            record("2025-02-10", 5000.0, "expense", "Food"),
            record("2025-03-01", 10000.0, "income", "Salary"),
            record("2025-03-10", 6000.0, "expense", "Food"),
            record("2025-03-12", 1000.0, "expense", "Transport"),
        ]
    }

    #[test]
    fn test_empty_list_is_no_data() {
        let out = contextual_insights("u1", &[], None, "KES").unwrap();
        assert_eq!(out.status, InsightStatus::NoData);
        assert!(!out.fresh);
        assert!(out.insights.is_none());
    }

    #[test]
    fn test_all_malformed_is_rejected() {
        let records = vec![record("not-a-date", 10.0, "expense", "Food")];
        let err = contextual_insights("u1", &records, None, "KES").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_partial_malformed_is_counted() {
        let mut records = sample();
        records.push(record("2025-03-15", -5.0, "expense", "Food"));
        let out = contextual_insights("u1", &records, None, "KES").unwrap();
        assert_eq!(out.skipped, 1);
        assert!(out.fresh);
    }

    #[test]
    fn test_oversized_amounts_are_skipped() {
        let huge = "79228162514264337593543950335";
        let records: Vec<TransactionRecord> = serde_json::from_value(json!([
            {"date": "2025-01-10", "amount": huge, "type": "expense", "category": "Food"},
            {"date": "2025-01-11", "amount": huge, "type": "expense", "category": "Food"},
            {"date": "2025-01-12", "amount": 250, "type": "expense", "category": "Food"},
        ]))
        .unwrap();

        let out = contextual_insights("u1", &records, None, "KES").unwrap();
        assert_eq!(out.skipped, 2);
        assert_eq!(
            out.insights.unwrap().metrics.total_expenses,
            Decimal::from(250)
        );

        let only_huge = &records[..2];
        let err = contextual_insights("u1", only_huge, None, "KES").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_analyze_survives_overflowing_totals() {
        let ceiling = Decimal::from(crate::models::MAX_AMOUNT_UNITS);
        let transactions: Vec<Transaction> = (0..3)
            .map(|i| Transaction {
                id: i,
                user_id: "u1".to_string(),
                amount: if i < 2 { Decimal::MAX } else { ceiling },
                date: chrono::NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                tx_type: TransactionType::Expense,
                category: "Food".to_string(),
                description: String::new(),
                counterparty: None,
            })
            .collect();

        let report = analyze(&transactions, None, "KES");
        assert_eq!(report.metrics.total_expenses, ceiling);
    }

    #[test]
    fn test_metrics() {
        let out = contextual_insights("u1", &sample(), None, "KES").unwrap();
        let report = out.insights.unwrap();
        let m = &report.metrics;

        assert_eq!(m.total_income, Decimal::from(30000));
        assert_eq!(m.total_expenses, Decimal::from(16000));
        assert_eq!(m.savings_rate, 46.7);
        assert_eq!(m.trend, SpendingTrend::Increasing);
        assert_eq!(m.growth_rate, 40.0);
        assert_eq!(m.overspending_streak, 2);
        assert!(!m.irregular_income);
        assert_eq!(report.top_categories[0].category, "Food");
        assert!(report.streak_alert.is_some());
        assert!(report
            .alerts
            .contains(&"Continuous spending increase detected.".to_string()));

        let profile = out.profile.unwrap();
        assert_eq!(profile.period_key.to_string(), "2025-03");
        assert_eq!(profile.total_expenses, Decimal::from(7000));
    }

    #[test]
    fn test_category_trends() {
        let txs = parse_records("u1", &sample()).0;
        let trends = category_trends(&txs);
        assert_eq!(trends.len(), 1);
        assert!(trends[0].contains("Food increased by 20.0%"));
    }

    #[test]
    fn test_irregular_income() {
        let records = vec![
            record("2025-01-01", 1000.0, "income", "Gigs"),
            record("2025-02-01", 5000.0, "income", "Gigs"),
        ];
        let report = contextual_insights("u1", &records, None, "KES")
            .unwrap()
            .insights
            .unwrap();
        assert!(report.metrics.irregular_income);
    }

    #[test]
    fn test_goal_projection() {
        let text = goal_projection(
            Some(Decimal::from(20000)),
            Decimal::from(10000),
            50.0,
            Decimal::from(4000),
        );
        assert_eq!(text, "Approx. 5.0 months to reach goal.");
        assert_eq!(
            goal_projection(None, Decimal::from(100), 50.0, Decimal::from(10)),
            "Goal projection unavailable."
        );
        assert_eq!(
            goal_projection(Some(Decimal::from(50)), Decimal::from(100), 50.0, Decimal::from(10)),
            "Savings goal already reached."
        );
    }
}
