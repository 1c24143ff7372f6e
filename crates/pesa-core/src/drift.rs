//! Drift between financial states
//!
//! Drift is a single-dimension measure: the relative change in total
//! expenses. Category mix is ignored.

use rust_decimal::Decimal;

use crate::aggregate::accumulate;
use crate::models::{ratio, ProfileSnapshot, TransactionSummary};

/// Drift reported when there is no usable baseline
pub const MAX_DRIFT: f64 = f64::INFINITY;

/// Relative expense change between two snapshots, as a fraction (0.2 = 20%)
///
/// Returns [`MAX_DRIFT`] when there is no previous snapshot or it had zero
/// expenses.
pub fn drift(old: Option<&ProfileSnapshot>, new: &ProfileSnapshot) -> f64 {
    match old {
        Some(old) => relative_change(old.total_expenses, new.total_expenses),
        None => MAX_DRIFT,
    }
}

/// Relative change in summed amounts between two transaction summaries
pub fn summary_drift(old: &[TransactionSummary], new: &[TransactionSummary]) -> f64 {
    if old.is_empty() || new.is_empty() {
        return MAX_DRIFT;
    }
    relative_change(summed(old), summed(new))
}

fn summed(summary: &[TransactionSummary]) -> Decimal {
    let mut total = Decimal::ZERO;
    for t in summary {
        accumulate(&mut total, t.amount);
    }
    total
}

fn relative_change(old: Decimal, new: Decimal) -> f64 {
    if old.is_zero() {
        return MAX_DRIFT;
    }
    match new.checked_sub(old) {
        Some(diff) => ratio(diff.abs(), old.abs()),
        None => MAX_DRIFT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::period::PeriodKey;

    fn snapshot(expenses: i64) -> ProfileSnapshot {
        ProfileSnapshot {
            period_key: PeriodKey::new(2025, 1).unwrap(),
            total_income: Decimal::from(2000),
            total_expenses: Decimal::from(expenses),
            savings: Decimal::from(2000 - expenses),
            savings_rate: 0.0,
            top_category: None,
        }
    }

    fn summary(amount: i64) -> TransactionSummary {
        TransactionSummary {
            amount: Decimal::from(amount),
            category: "Food".to_string(),
            tx_type: TransactionType::Expense,
        }
    }

    #[test]
    fn test_drift_fraction() {
        let d = drift(Some(&snapshot(1000)), &snapshot(1200));
        assert!((d - 0.2).abs() < 1e-9);

        let d = drift(Some(&snapshot(1000)), &snapshot(900));
        assert!((d - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_drift_without_baseline_is_max() {
        assert_eq!(drift(None, &snapshot(100)), MAX_DRIFT);
        assert_eq!(drift(Some(&snapshot(0)), &snapshot(100)), MAX_DRIFT);
    }

    #[test]
    fn test_identical_snapshots_have_zero_drift() {
        assert_eq!(drift(Some(&snapshot(750)), &snapshot(750)), 0.0);
    }

    #[test]
    fn test_summary_drift() {
        let old = vec![summary(100), summary(100)];
        let new = vec![summary(100), summary(160)];
        assert!((summary_drift(&old, &new) - 0.3).abs() < 1e-9);
        assert_eq!(summary_drift(&[], &new), MAX_DRIFT);
        assert_eq!(summary_drift(&[summary(0)], &new), MAX_DRIFT);
    }

    #[test]
    fn test_extreme_totals_do_not_panic() {
        let tiny = Decimal::new(1, 28);
        assert!(relative_change(tiny, Decimal::MAX) > 1e50);
        assert_eq!(relative_change(Decimal::MAX, Decimal::MIN), MAX_DRIFT);

        let huge = TransactionSummary {
            amount: Decimal::MAX,
            ..summary(0)
        };
        let d = summary_drift(&[summary(100)], &[huge.clone(), huge]);
        assert!(d.is_finite() && d > 1e20);
    }
}
