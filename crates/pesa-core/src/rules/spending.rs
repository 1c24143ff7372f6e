//! Rules over the period's income, expenses and savings

use rust_decimal::Decimal;

use crate::models::{AlertKind, AlertSeverity, NewAlert};

use super::engine::{AlertRule, RuleContext};

/// Expenses above `overspend_ratio` of income, or above a fixed limit when
/// there is no income
pub struct OverspendingRule;

impl AlertRule for OverspendingRule {
    fn kind(&self) -> AlertKind {
        AlertKind::Overspending
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert> {
        let p = ctx.profile;
        let limit = if p.total_income > Decimal::ZERO {
            p.total_income
                .checked_mul(ctx.thresholds.overspend_ratio)
                .unwrap_or(Decimal::MAX)
        } else {
            ctx.thresholds.no_income_expense_limit
        };

        if p.total_expenses <= limit {
            return vec![];
        }

        vec![ctx.alert(
            self.kind(),
            "High Spending Detected",
            format!(
                "You've spent {} in {}, that's quite high!",
                ctx.money(p.total_expenses),
                p.period_key
            ),
            "expense",
            AlertSeverity::Warning,
        )]
    }
}

pub struct ExpensesExceedIncomeRule;

impl AlertRule for ExpensesExceedIncomeRule {
    fn kind(&self) -> AlertKind {
        AlertKind::ExpensesExceedIncome
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert> {
        let p = ctx.profile;
        if p.total_income <= Decimal::ZERO || p.total_expenses <= p.total_income {
            return vec![];
        }

        vec![ctx.alert(
            self.kind(),
            "Expenses Exceed Income",
            format!(
                "Expenses of {} exceed income of {} by {}. Review your budget allocations.",
                ctx.money(p.total_expenses),
                ctx.money(p.total_income),
                ctx.money(p.total_expenses - p.total_income)
            ),
            "budget",
            AlertSeverity::Critical,
        )]
    }
}

/// Saving something, but less than `low_savings_rate` of income
///
/// Negative rates are left to [`ExpensesExceedIncomeRule`].
pub struct LowSavingsRateRule;

impl AlertRule for LowSavingsRateRule {
    fn kind(&self) -> AlertKind {
        AlertKind::LowSavingsRate
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert> {
        let p = ctx.profile;
        if p.total_income <= Decimal::ZERO
            || p.savings_rate < 0.0
            || p.savings_rate >= ctx.thresholds.low_savings_rate
        {
            return vec![];
        }

        vec![ctx.alert(
            self.kind(),
            "Low Savings Rate",
            format!(
                "You're saving {:.1}% of your income. Consider automating monthly transfers.",
                p.savings_rate * 100.0
            ),
            "savings",
            AlertSeverity::Warning,
        )]
    }
}

pub struct SavingsMilestoneRule;

impl AlertRule for SavingsMilestoneRule {
    fn kind(&self) -> AlertKind {
        AlertKind::SavingsMilestone
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert> {
        let p = ctx.profile;
        let milestone = p.total_income.checked_mul(ctx.thresholds.milestone_ratio);
        if p.savings <= Decimal::ZERO || milestone.map_or(true, |m| p.savings <= m) {
            return vec![];
        }

        vec![ctx.alert(
            self.kind(),
            "Savings Milestone",
            format!(
                "Great job! You've saved {} in {}.",
                ctx.money(p.savings),
                p.period_key
            ),
            "goal",
            AlertSeverity::Info,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::config::RuleThresholds;
    use crate::models::FinancialProfile;

    fn profile(income: i64, expenses: i64) -> FinancialProfile {
        let mut p = FinancialProfile::empty("u1", "2025-03".parse().unwrap());
        p.total_income = Decimal::from(income);
        p.total_expenses = Decimal::from(expenses);
        p.savings = p.total_income - p.total_expenses;
        p.savings_rate = if income > 0 {
            (income - expenses) as f64 / income as f64
        } else {
            0.0
        };
        p
    }

    fn fire(rule: &dyn AlertRule, p: &FinancialProfile) -> Vec<NewAlert> {
        let thresholds = RuleThresholds::default();
        let monthly = BTreeMap::new();
        let ctx = RuleContext {
            profile: p,
            transactions: &[],
            monthly: &monthly,
            thresholds: &thresholds,
            currency: "KES",
        };
        rule.evaluate(&ctx)
    }

    #[test]
    fn test_overspending() {
        let alerts = fire(&OverspendingRule, &profile(1000, 900));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert!(alerts[0].message.contains("KES 900.00"));

        assert!(fire(&OverspendingRule, &profile(1000, 700)).is_empty());
        assert!(fire(&OverspendingRule, &profile(1000, 800)).is_empty());
    }

    #[test]
    fn test_overspending_without_income_uses_fixed_limit() {
        assert!(fire(&OverspendingRule, &profile(0, 1000)).is_empty());
        assert_eq!(fire(&OverspendingRule, &profile(0, 1001)).len(), 1);
    }

    #[test]
    fn test_expenses_exceed_income() {
        let alerts = fire(&ExpensesExceedIncomeRule, &profile(1000, 1200));
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert!(alerts[0].message.contains("KES 200.00"));
        assert!(fire(&ExpensesExceedIncomeRule, &profile(0, 1200)).is_empty());
        assert!(fire(&ExpensesExceedIncomeRule, &profile(1000, 1000)).is_empty());
    }

    #[test]
    fn test_low_savings_rate() {
        assert_eq!(fire(&LowSavingsRateRule, &profile(1000, 950)).len(), 1);
        assert_eq!(fire(&LowSavingsRateRule, &profile(1000, 1000)).len(), 1);
        assert!(fire(&LowSavingsRateRule, &profile(1000, 850)).is_empty());
        assert!(fire(&LowSavingsRateRule, &profile(1000, 1100)).is_empty());
        assert!(fire(&LowSavingsRateRule, &profile(0, 100)).is_empty());
    }

    #[test]
    fn test_savings_milestone() {
        let alerts = fire(&SavingsMilestoneRule, &profile(1000, 600));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
        assert!(fire(&SavingsMilestoneRule, &profile(1000, 700)).is_empty());
        assert!(fire(&SavingsMilestoneRule, &profile(0, 0)).is_empty());
    }
}
