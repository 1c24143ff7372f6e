//! Advice generation - prompt building on top of a text generator

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::ai::{AIClient, TextGenerator};
use crate::error::Result;
use crate::models::{decimal_to_f64, format_amount, ProfileSnapshot};

/// Extra context fed into the advice prompt
#[derive(Debug, Clone, Default)]
pub struct AdviceContext {
    /// Profile of the period before the one being advised on
    pub previous: Option<ProfileSnapshot>,
    pub alert_summary: Option<String>,
    pub previous_advice: Option<String>,
}

/// Month-over-month percentage changes, rounded to one decimal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyChanges {
    pub income_change: f64,
    pub expense_change: f64,
    pub savings_change: f64,
}

impl MonthlyChanges {
    /// Changes between two periods; None unless both have income
    pub fn between(previous: &ProfileSnapshot, current: &ProfileSnapshot) -> Option<Self> {
        if previous.total_income <= Decimal::ZERO || current.total_income <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            income_change: percent_change(previous.total_income, current.total_income),
            expense_change: percent_change(previous.total_expenses, current.total_expenses),
            savings_change: percent_change(previous.savings, current.savings),
        })
    }
}

/// Percent change rounded to one decimal; 0 when the base is not positive
fn percent_change(old: Decimal, new: Decimal) -> f64 {
    if old <= Decimal::ZERO {
        return 0.0;
    }
    new.checked_sub(old)
        .and_then(|diff| diff.checked_div(old))
        .and_then(|change| change.checked_mul(Decimal::ONE_HUNDRED))
        .map(|percent| decimal_to_f64(percent.round_dp(1)))
        .unwrap_or_else(|| {
            let percent = (decimal_to_f64(new) - decimal_to_f64(old)) / decimal_to_f64(old) * 100.0;
            (percent * 10.0).round() / 10.0
        })
}

/// Builds advice prompts and sends them to the configured backend
#[derive(Clone)]
pub struct AdviceGenerator {
    client: AIClient,
    max_tokens: u32,
    currency: String,
}

impl AdviceGenerator {
    pub fn new(client: AIClient, max_tokens: u32, currency: &str) -> Self {
        Self {
            client,
            max_tokens,
            currency: currency.to_string(),
        }
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    /// Generate advice for `profile`
    pub async fn generate(&self, profile: &ProfileSnapshot, context: &AdviceContext) -> Result<String> {
        let prompt = build_prompt(profile, context, &self.currency);
        debug!(model = self.client.model(), "Requesting advice");
        self.client.complete(&prompt, self.max_tokens).await
    }
}

fn money(currency: &str, amount: Decimal) -> String {
    format!("{} {}", currency, format_amount(amount))
}

fn previous_money(currency: &str, amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        money(currency, amount)
    } else {
        "N/A".to_string()
    }
}

/// Render the advice prompt
pub fn build_prompt(profile: &ProfileSnapshot, context: &AdviceContext, currency: &str) -> String {
    let mut prompt = String::from(
        "You are a smart financial advisor analyzing user spending patterns.\n\nUSER FINANCIAL CONTEXT:\n",
    );
    prompt.push_str(&format!(
        "- Latest alerts: {}\n",
        context.alert_summary.as_deref().unwrap_or("No recent alerts")
    ));
    prompt.push_str(&format!(
        "- Previous advice: {}\n\n",
        context
            .previous_advice
            .as_deref()
            .unwrap_or("No previous insights")
    ));

    prompt.push_str(&format!("CURRENT MONTH ({}):\n", profile.period_key));
    prompt.push_str(&format!("- Income: {}\n", money(currency, profile.total_income)));
    prompt.push_str(&format!(
        "- Expenses: {}\n",
        money(currency, profile.total_expenses)
    ));
    prompt.push_str(&format!("- Savings: {}\n", money(currency, profile.savings)));
    prompt.push_str(&format!(
        "- Savings rate: {:.1}%\n",
        profile.savings_rate_percent()
    ));
    prompt.push_str(&format!(
        "- Top Spending Category: {}\n\n",
        profile.top_category.as_deref().unwrap_or("None")
    ));

    match &context.previous {
        Some(prev) => {
            prompt.push_str(&format!("PREVIOUS MONTH ({}):\n", prev.period_key));
            prompt.push_str(&format!(
                "- Income: {}\n",
                previous_money(currency, prev.total_income)
            ));
            prompt.push_str(&format!(
                "- Expenses: {}\n",
                previous_money(currency, prev.total_expenses)
            ));
            prompt.push_str(&format!(
                "- Savings: {}\n\n",
                previous_money(currency, prev.savings)
            ));
        }
        None => prompt.push_str("PREVIOUS MONTH (N/A):\n- No data\n\n"),
    }

    match context
        .previous
        .as_ref()
        .and_then(|prev| MonthlyChanges::between(prev, profile))
    {
        Some(changes) => {
            prompt.push_str("MONTHLY CHANGES:\n");
            prompt.push_str(&format!("- Income change: {:+.1}%\n", changes.income_change));
            prompt.push_str(&format!("- Expense change: {:+.1}%\n", changes.expense_change));
            prompt.push_str(&format!("- Savings change: {:+.1}%\n\n", changes.savings_change));
        }
        None => {
            prompt.push_str("TREND ANALYSIS:\n- Not enough data for trend analysis yet\n\n");
        }
    }

    prompt.push_str(
        "Task: Provide 2-3 short, actionable, and motivational financial recommendations based on this data.\n\
         Focus on specific behavior changes, trend analysis, and practical budgeting improvements.\n\
         Format as bullet points with clear, concise language.\n\
         If they have low savings, suggest practical ways to increase savings.\n\
         If they have consistent spending, acknowledge good habits.\n",
    );

    prompt
}
