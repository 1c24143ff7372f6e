//! Alert command implementations

use anyhow::{bail, Result};
use pesa_core::ai::AIClient;
use pesa_core::db::Database;
use pesa_core::models::{Alert, AlertSeverity};
use pesa_core::{AlertExplainer, PeriodKey, RuleEngine};

use super::{load_config, truncate};

fn severity_icon(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => "🔴",
        AlertSeverity::Warning => "🟡",
        AlertSeverity::Info => "🔵",
    }
}

fn print_alert(alert: &Alert) {
    let read_marker = if alert.is_read { " " } else { "•" };
    println!(
        "   {} {} [{:>4}] {} ({})",
        read_marker,
        severity_icon(alert.severity),
        alert.id,
        alert.title,
        alert.kind
    );
    println!("            {}", truncate(&alert.message, 100));
}

pub fn cmd_alerts_generate(db: &Database, user: &str) -> Result<()> {
    let config = load_config();
    let engine = RuleEngine::from_config(&config);
    let period = PeriodKey::current();

    println!("🔍 Running alert rules for {} ({})...", user, period);
    let alerts = engine.generate_and_persist(db, user, period)?;

    if alerts.is_empty() {
        println!("✅ No alerts. Spending looks on track.");
        return Ok(());
    }

    println!();
    println!("🚨 {} new alert(s)", alerts.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for alert in &alerts {
        print_alert(alert);
    }

    Ok(())
}

pub fn cmd_alerts_list(db: &Database, user: &str, unread_only: bool) -> Result<()> {
    let alerts = db.list_alerts(user, unread_only)?;

    if alerts.is_empty() {
        if unread_only {
            println!("No unread alerts.");
        } else {
            println!("No alerts yet. Run the rules with:");
            println!("  pesa alerts generate");
        }
        return Ok(());
    }

    let unread = alerts.iter().filter(|a| !a.is_read).count();

    println!();
    println!("🚨 Alerts ({} unread)", unread);
    println!("   ─────────────────────────────────────────────────────────────");
    for alert in &alerts {
        print_alert(alert);
    }

    Ok(())
}

pub fn cmd_alerts_read(db: &Database, id: i64) -> Result<()> {
    if !db.mark_alert_read(id)? {
        bail!("Alert {} not found", id);
    }
    println!("✅ Alert {} marked as read", id);
    Ok(())
}

pub async fn cmd_alerts_explain(db: &Database, user: &str, id: i64) -> Result<()> {
    let alert = match db.get_alert(id)? {
        Some(alert) if alert.user_id == user => alert,
        _ => bail!("Alert {} not found for user {}", id, user),
    };

    let config = load_config();
    let summary_size = config.insights.summary_size as i64;
    let timeout = config.advice.generator_timeout();
    let explainer =
        AlertExplainer::new(db.clone(), AIClient::from_env(), config.insights).with_timeout(timeout);

    let recent = db.list_transactions(user, summary_size)?;

    println!();
    print_alert(&alert);
    println!();

    match explainer.explain(user, &alert, &recent).await? {
        Some(explanation) => {
            let origin = if explanation.cached { "cached" } else { "new" };
            println!("   💡 {} ({})", explanation.response, origin);
        }
        None => {
            println!("   ℹ️  No explanation available (text generator not configured or not responding)");
        }
    }

    Ok(())
}
