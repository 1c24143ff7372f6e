//! Deterministic advice used when the generator is unavailable

use crate::models::ProfileSnapshot;

/// Returned when a user has no transactions and no cached advice
pub const ONBOARDING_ADVICE: &str = "No financial data available yet to generate advice. \
Start adding transactions to get personalized recommendations.";

/// Advice text for a savings rate (fraction of income)
pub fn advice_for_savings_rate(rate: f64) -> &'static str {
    if rate < 0.0 {
        "Your expenses exceed your income. Review discretionary spending and build a budget \
         that brings spending back under what you earn."
    } else if rate < 0.10 {
        "Your savings rate is low. Try to save at least 20% of your income by automating a \
         transfer to savings as soon as you are paid."
    } else if rate < 0.20 {
        "Good start! Your savings habit is developing. Consider increasing your savings rate \
         gradually each month."
    } else {
        "Excellent savings rate! You're on track for financial security. Consider investing \
         part of your surplus."
    }
}

/// Rule-based advice keyed on savings rate
pub fn fallback_advice(profile: &ProfileSnapshot) -> String {
    let rate = profile.savings_rate;
    let text = advice_for_savings_rate(rate);

    match &profile.top_category {
        Some(category) if rate < 0.20 => format!(
            "{} Your biggest expense category is {}, a good place to start.",
            text, category
        ),
        _ => text.to_string(),
    }
}
