//! Alert rule engine
//!
//! Scans aggregated metrics against a fixed catalog of threshold rules and
//! emits structured alerts. The engine is stateless: every firing rule is
//! emitted on every run, in registration order, with no deduplication.
//!
//! ## Built-in rules
//!
//! - **Overspending** - expenses above a share of income (warning)
//! - **Expenses exceed income** - spending more than earned (critical)
//! - **Low savings rate** - saving under the configured rate (warning)
//! - **Savings milestone** - saving a large share of income (info)
//! - **Large transaction** - one alert per transaction over the limit (info)
//! - **Rising trend** - monthly expenses rising several months running (warning)

pub mod engine;
pub mod spending;
pub mod trend;

pub use engine::{AlertRule, RuleContext, RuleEngine};
pub use spending::{
    ExpensesExceedIncomeRule, LowSavingsRateRule, OverspendingRule, SavingsMilestoneRule,
};
pub use trend::{rising_streak, LargeTransactionRule, RisingTrendRule};
