//! Advisor command implementations (profile, advice, insights, health)

use std::path::Path;

use anyhow::{Context, Result};
use pesa_core::advisor::{contextual_insights, InsightStatus};
use pesa_core::ai::AIClient;
use pesa_core::db::Database;
use pesa_core::health::{health_from_transactions, window_start};
use pesa_core::models::{format_amount, ProfileSnapshot, TransactionRecord};
use pesa_core::{aggregate, drift, AdviceSource, Advisor, PeriodKey};
use rust_decimal::Decimal;

use super::load_config;

fn print_snapshot(snapshot: &ProfileSnapshot, currency: &str) {
    println!("   Income:    {} {}", currency, format_amount(snapshot.total_income));
    println!("   Expenses:  {} {}", currency, format_amount(snapshot.total_expenses));
    println!("   Savings:   {} {}", currency, format_amount(snapshot.savings));
    println!("   Rate:      {:.1}%", snapshot.savings_rate * 100.0);
    if let Some(ref category) = snapshot.top_category {
        println!("   Top:       {}", category);
    }
}

pub fn cmd_profile(db: &Database, user: &str, period: Option<PeriodKey>) -> Result<()> {
    let period = period.unwrap_or_else(PeriodKey::current);
    let config = load_config();

    let transactions = db.transactions_for_period(user, period)?;
    let aggregation = aggregate(user, &transactions, period);
    db.upsert_profile(&aggregation.profile)?;

    let snapshot = aggregation.profile.snapshot();
    println!();
    println!("📊 Profile for {} ({})", user, period);
    println!("   ─────────────────────────────────────────");
    print_snapshot(&snapshot, &config.advice.currency);

    if aggregation.skipped > 0 {
        println!("   ⚠️  {} malformed entries ignored", aggregation.skipped);
    }

    if !aggregation.category_totals.is_empty() {
        println!();
        println!("   Spending by category:");
        let mut categories: Vec<_> = aggregation.category_totals.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, amount) in categories {
            println!("     {:<16} {}", category, format_amount(*amount));
        }
    }

    if let Some(previous) = db.get_profile(user, period.previous())? {
        let change = drift(Some(&previous.snapshot()), &snapshot);
        println!();
        println!("   Drift from {}: {:.1}%", previous.period_key, change * 100.0);
    }

    Ok(())
}

pub async fn cmd_advice(
    db: &Database,
    user: &str,
    period: Option<PeriodKey>,
    json: bool,
) -> Result<()> {
    let config = load_config();
    let advisor = Advisor::new(db.clone(), AIClient::from_env(), &config.advice);
    let period = period.unwrap_or_else(PeriodKey::current);

    let outcome = advisor.get_advice_for_period(user, period).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let label = match outcome.source {
        AdviceSource::Cache => "💾 cached",
        AdviceSource::Generated => "✨ freshly generated",
        AdviceSource::Error => "⚠️  fallback",
        AdviceSource::NoData => "👋 getting started",
    };

    println!();
    println!("💡 Advice for {} ({}) - {}", user, period, label);
    println!("   ─────────────────────────────────────────");
    if let Some(ref profile) = outcome.profile {
        print_snapshot(profile, &config.advice.currency);
        println!();
    }
    println!("   {}", outcome.advice);

    if outcome.is_degraded() && !advisor.has_generator() {
        println!();
        println!("   ℹ️  Set OLLAMA_HOST to enable generated advice");
    }

    Ok(())
}

pub fn cmd_insights(user: &str, file: &Path, goal: Option<Decimal>, json: bool) -> Result<()> {
    let config = load_config();

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records: Vec<TransactionRecord> =
        serde_json::from_str(&content).context("Expected a JSON array of transaction records")?;

    let insights = contextual_insights(user, &records, goal, &config.advice.currency)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    println!();
    println!("🔎 Contextual insights for {}", user);
    println!("   ─────────────────────────────────────────");

    if insights.status == InsightStatus::NoData {
        println!("   {}", insights.contextual_advice);
        return Ok(());
    }

    if let Some(ref report) = insights.insights {
        println!("   {}", report.spending_overview);
        println!("   {}", report.trend_analysis);
        println!("   {}", report.savings_analysis);
        println!("   {}", report.goal_projection);
        println!("   {}", report.income_stability);
        if let Some(ref streak) = report.streak_alert {
            println!("   {}", streak);
        }
        for message in &report.category_trends {
            println!("   • {}", message);
        }
        for alert in &report.alerts {
            println!("   ⚠️  {}", alert);
        }
    }

    println!();
    println!("   💡 {}", insights.contextual_advice);
    if insights.skipped > 0 {
        println!("   ({} malformed records skipped)", insights.skipped);
    }

    Ok(())
}

pub fn cmd_health(db: &Database, user: &str) -> Result<()> {
    let config = load_config();
    let through = PeriodKey::current();
    let from = window_start(through);

    let transactions = db.transactions_between(user, from, through)?;
    let report = health_from_transactions(&transactions);

    println!();
    println!("❤️  Financial health for {} ({} to {})", user, from, through);
    println!("   ─────────────────────────────────────────");
    println!("   Score:          {}/100 ({})", report.score, report.level);
    println!(
        "   Income:         {} {}",
        config.advice.currency,
        format_amount(report.total_income)
    );
    println!(
        "   Expenses:       {} {}",
        config.advice.currency,
        format_amount(report.total_expenses)
    );
    println!("   Savings rate:   {:.1}%", report.savings_rate);
    println!("   Expense ratio:  {:.1}%", report.expense_ratio);

    Ok(())
}
