//! Rule engine - evaluates the rule catalog and persists alert batches

use std::collections::BTreeMap;

use crate::aggregate::{aggregate, monthly_totals, MonthTotals};
use crate::config::{AdvisorConfig, RuleThresholds};
use crate::db::Database;
use crate::models::{Alert, AlertKind, FinancialProfile, NewAlert, Transaction};
use crate::period::PeriodKey;
use crate::Result;

use super::{
    ExpensesExceedIncomeRule, LargeTransactionRule, LowSavingsRateRule, OverspendingRule,
    RisingTrendRule, SavingsMilestoneRule,
};

/// Months of history loaded for trend rules
const TREND_HISTORY_MONTHS: usize = 12;

/// Inputs available to every rule
pub struct RuleContext<'a> {
    pub profile: &'a FinancialProfile,
    /// Transactions inside the profile's period
    pub transactions: &'a [Transaction],
    /// Monthly totals up to and including the profile's period
    pub monthly: &'a BTreeMap<PeriodKey, MonthTotals>,
    pub thresholds: &'a RuleThresholds,
    pub currency: &'a str,
}

impl RuleContext<'_> {
    /// Start an alert for this context's user
    pub fn alert(
        &self,
        kind: AlertKind,
        title: &str,
        message: String,
        category: &str,
        severity: crate::models::AlertSeverity,
    ) -> NewAlert {
        NewAlert {
            user_id: self.profile.user_id.clone(),
            kind,
            title: title.to_string(),
            message,
            category: category.to_string(),
            severity,
        }
    }

    /// Format an amount with the configured currency ("KES 900.00")
    pub fn money(&self, amount: rust_decimal::Decimal) -> String {
        format!("{} {:.2}", self.currency, amount)
    }
}

/// A threshold rule
pub trait AlertRule: Send + Sync {
    fn kind(&self) -> AlertKind;

    /// Alerts this rule fires for the context (usually zero or one)
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<NewAlert>;
}

/// Evaluates registered rules in order
pub struct RuleEngine {
    rules: Vec<Box<dyn AlertRule>>,
    thresholds: RuleThresholds,
    currency: String,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleThresholds::default(), "KES")
    }
}

impl RuleEngine {
    /// Create an engine with the built-in rule catalog
    pub fn new(thresholds: RuleThresholds, currency: &str) -> Self {
        let mut engine = Self {
            rules: vec![],
            thresholds,
            currency: currency.to_string(),
        };

        engine.register(Box::new(OverspendingRule));
        engine.register(Box::new(ExpensesExceedIncomeRule));
        engine.register(Box::new(LowSavingsRateRule));
        engine.register(Box::new(SavingsMilestoneRule));
        engine.register(Box::new(LargeTransactionRule));
        engine.register(Box::new(RisingTrendRule));

        engine
    }

    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(config.rules.clone(), &config.advice.currency)
    }

    /// Register an additional rule (evaluated after the existing ones)
    pub fn register(&mut self, rule: Box<dyn AlertRule>) {
        self.rules.push(rule);
    }

    /// Kinds of the registered rules, in evaluation order
    pub fn rule_kinds(&self) -> Vec<AlertKind> {
        self.rules.iter().map(|r| r.kind()).collect()
    }

    /// Evaluate every rule against a profile
    ///
    /// `transactions` may span several months; per-transaction rules only
    /// consider those inside the profile's period, trend rules use the
    /// months up to it.
    pub fn evaluate(&self, transactions: &[Transaction], profile: &FinancialProfile) -> Vec<NewAlert> {
        let period = profile.period_key;
        let in_period: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| period.contains(tx.date))
            .cloned()
            .collect();
        let monthly: BTreeMap<PeriodKey, MonthTotals> = monthly_totals(transactions)
            .into_iter()
            .filter(|(month, _)| *month <= period)
            .collect();

        let ctx = RuleContext {
            profile,
            transactions: &in_period,
            monthly: &monthly,
            thresholds: &self.thresholds,
            currency: &self.currency,
        };

        let mut alerts = vec![];
        for rule in &self.rules {
            let fired = rule.evaluate(&ctx);
            if !fired.is_empty() {
                tracing::debug!(
                    rule = rule.kind().as_str(),
                    count = fired.len(),
                    "Rule fired"
                );
            }
            alerts.extend(fired);
        }
        alerts
    }

    /// Evaluate a user's ledger for `period`, persist the batch and feed a
    /// summary back into the advice cache
    pub fn generate_and_persist(
        &self,
        db: &Database,
        user_id: &str,
        period: PeriodKey,
    ) -> Result<Vec<Alert>> {
        let mut from = period;
        for _ in 0..TREND_HISTORY_MONTHS {
            from = from.previous();
        }
        let transactions = db.transactions_between(user_id, from, period)?;

        let aggregation = aggregate(user_id, &transactions, period);
        db.upsert_profile(&aggregation.profile)?;

        let batch = self.evaluate(&transactions, &aggregation.profile);
        let stored = db.insert_alerts(&batch)?;

        if let Some(summary) = summarize_alerts(&stored) {
            db.set_alert_summary(user_id, &summary)?;
        }

        tracing::info!(user_id, period = %period, alerts = stored.len(), "Alerts generated");
        Ok(stored)
    }
}

/// Short summary of an alert batch for the advice prompt
pub fn summarize_alerts(alerts: &[Alert]) -> Option<String> {
    if alerts.is_empty() {
        return None;
    }
    let mut titles: Vec<&str> = Vec::new();
    for alert in alerts {
        if !titles.contains(&alert.title.as_str()) {
            titles.push(&alert.title);
        }
    }
    Some(titles.join("; "))
}
