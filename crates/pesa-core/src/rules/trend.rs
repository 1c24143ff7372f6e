//! Per-transaction and multi-month rules

use std::collections::BTreeMap;

use crate::aggregate::MonthTotals;
use crate::models::{AlertKind, AlertSeverity, NewAlert};
use crate::period::PeriodKey;

use super::engine::{AlertRule, RuleContext};

/// One alert per transaction above `large_transaction`
pub struct LargeTransactionRule;

impl AlertRule for LargeTransactionRule {
    fn kind(&self) -> AlertKind {
        AlertKind::LargeTransaction
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert> {
        ctx.transactions
            .iter()
            .filter(|tx| tx.amount > ctx.thresholds.large_transaction)
            .map(|tx| {
                ctx.alert(
                    self.kind(),
                    "Large Transaction",
                    format!(
                        "A transaction of {} was recorded ({}) on {}.",
                        ctx.money(tx.amount),
                        tx.category,
                        tx.date
                    ),
                    tx.tx_type.as_str(),
                    AlertSeverity::Info,
                )
            })
            .collect()
    }
}

/// Monthly expenses rising for `rising_trend_months` consecutive months
pub struct RisingTrendRule;

impl AlertRule for RisingTrendRule {
    fn kind(&self) -> AlertKind {
        AlertKind::RisingTrend
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert> {
        let streak = rising_streak(ctx.monthly, ctx.profile.period_key);
        if streak < ctx.thresholds.rising_trend_months.max(1) {
            return vec![];
        }

        vec![ctx.alert(
            self.kind(),
            "Rising Expenses",
            format!(
                "Your expenses have risen for {} consecutive months.",
                streak
            ),
            "trend",
            AlertSeverity::Warning,
        )]
    }
}

/// Number of consecutive month-over-month expense increases ending at `through`
///
/// Months without entries count as zero spending; months before the first
/// recorded month are never compared.
pub fn rising_streak(monthly: &BTreeMap<PeriodKey, MonthTotals>, through: PeriodKey) -> usize {
    let Some(first) = monthly.keys().next().copied() else {
        return 0;
    };
    let expenses = |month: PeriodKey| monthly.get(&month).map(|t| t.expenses).unwrap_or_default();

    let mut streak = 0;
    let mut month = through;
    while month > first {
        let prev = month.previous();
        if expenses(month) > expenses(prev) {
            streak += 1;
            month = prev;
        } else {
            break;
        }
    }
    streak
}
