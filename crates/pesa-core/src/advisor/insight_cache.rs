//! Cached explanations for alerts
//!
//! An explanation is keyed by a hash of the alert text and a summary of the
//! transactions it was generated from. A cached response is reused until it
//! is older than `refresh_days` or the transaction summary has drifted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::ai::{AIClient, TextGenerator};
use crate::config::InsightCacheConfig;
use crate::db::Database;
use crate::drift::summary_drift;
use crate::error::{Error, Result};
use crate::models::{Alert, InsightCacheEntry, Transaction, TransactionSummary};

/// An alert explanation and whether it came from the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub response: String,
    pub cached: bool,
}

/// Summarize the first `size` transactions for hashing and drift checks
pub fn summarize_transactions(transactions: &[Transaction], size: usize) -> Vec<TransactionSummary> {
    transactions
        .iter()
        .take(size)
        .map(TransactionSummary::from)
        .collect()
}

/// Hash of an alert's text and its transaction context
pub fn insight_hash(title: &str, message: &str, summary: &[TransactionSummary]) -> String {
    let json = serde_json::to_string(summary).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(message.as_bytes());
    hasher.update(b"|");
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates and caches alert explanations
pub struct AlertExplainer {
    db: Database,
    client: Option<AIClient>,
    config: InsightCacheConfig,
    timeout: Duration,
}

impl AlertExplainer {
    pub fn new(db: Database, client: Option<AIClient>, config: InsightCacheConfig) -> Self {
        Self {
            db,
            client,
            config,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Explain `alert` in the context of `transactions`
    ///
    /// Returns `Ok(None)` when no cached explanation is usable and the
    /// generator is unavailable.
    pub async fn explain(
        &self,
        user_id: &str,
        alert: &Alert,
        transactions: &[Transaction],
    ) -> Result<Option<Explanation>> {
        let summary = summarize_transactions(transactions, self.config.summary_size);
        let hash = insight_hash(&alert.title, &alert.message, &summary);

        if let Some(cached) = self.db.get_insight(user_id, &hash)? {
            if self.is_fresh(&cached, &summary, Utc::now()) {
                debug!(user_id = %user_id, alert_id = alert.id, "Reusing cached alert insight");
                return Ok(Some(Explanation {
                    response: cached.response,
                    cached: true,
                }));
            }
        }

        let response = match self.generate(alert, &summary).await {
            Ok(response) => response,
            Err(e) => {
                warn!(user_id = %user_id, alert_id = alert.id, error = %e, "Alert insight generation failed");
                return Ok(None);
            }
        };

        self.db.upsert_insight(&InsightCacheEntry {
            user_id: user_id.to_string(),
            context_hash: hash,
            alert_title: alert.title.clone(),
            alert_message: alert.message.clone(),
            transaction_summary: summary,
            response: response.clone(),
            last_refreshed_at: Utc::now(),
        })?;
        info!(user_id = %user_id, alert_id = alert.id, "Alert insight refreshed");

        Ok(Some(Explanation {
            response,
            cached: false,
        }))
    }

    fn is_fresh(
        &self,
        cached: &InsightCacheEntry,
        summary: &[TransactionSummary],
        now: DateTime<Utc>,
    ) -> bool {
        let age = now - cached.last_refreshed_at;
        if age > chrono::Duration::days(self.config.refresh_days) {
            return false;
        }
        summary_drift(&cached.transaction_summary, summary) <= self.config.drift_threshold
    }

    async fn generate(&self, alert: &Alert, summary: &[TransactionSummary]) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::Generator("no text generator configured".to_string()))?;
        let prompt = build_insight_prompt(alert, summary)?;

        match tokio::time::timeout(self.timeout, client.complete(&prompt, self.config.max_tokens)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Generator("alert insight timed out".to_string())),
        }
    }
}

fn build_insight_prompt(alert: &Alert, summary: &[TransactionSummary]) -> Result<String> {
    Ok(format!(
        "Alert: {}\nMessage: {}\nRecent transactions: {}\n\n\
         Provide a concise and actionable recommendation (max 3 sentences).",
        alert.title,
        alert.message,
        serde_json::to_string(summary)?
    ))
}
