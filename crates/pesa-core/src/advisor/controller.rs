//! Advice cache controller
//!
//! Decides per request whether cached advice can be reused or must be
//! regenerated, calls the generator with a timeout, and persists the result.
//! The decide-generate-persist cycle is serialized per user so concurrent
//! requests for the same user make at most one generator call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::aggregate;
use crate::ai::AIClient;
use crate::config::AdviceConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{AdviceCacheEntry, FinancialProfile, ProfileSnapshot};
use crate::period::PeriodKey;
use crate::store::AdvisorStore;

use super::fallback::{fallback_advice, ONBOARDING_ADVICE};
use super::generator::{AdviceContext, AdviceGenerator};
use super::policy::{CacheState, Decision, StalenessPolicy};

/// Where the returned advice came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceSource {
    Cache,
    Generated,
    /// Fallback advice, or generated advice that could not be stored
    Error,
    /// No data yet; onboarding text
    #[serde(rename = "none")]
    NoData,
}

/// Why an outcome is degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// Generator errored, timed out or is not configured
    GeneratorUnavailable,
    /// Generated advice could not be written to the cache
    NotPersisted,
}

/// Result of an advice request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceOutcome {
    pub advice: String,
    pub source: AdviceSource,
    pub profile: Option<ProfileSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation: Option<Degradation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<CacheState>,
}

impl AdviceOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Registry of per-user async mutexes
///
/// Only users with a lock handle still alive stay in the map; the rest are
/// pruned on the next lookup.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `user_id`, created on first use
    pub fn lock_for(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map's own reference is the only one left once every caller is done
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(user_id.to_string()).or_default().clone()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached, drift-aware financial advice
pub struct Advisor<S: AdvisorStore = Database> {
    store: S,
    generator: Option<AdviceGenerator>,
    policy: StalenessPolicy,
    locks: UserLocks,
    timeout: Duration,
}

impl<S: AdvisorStore> Advisor<S> {
    /// Create an advisor; with no client every regeneration falls back to
    /// rule-based advice
    pub fn new(store: S, client: Option<AIClient>, config: &AdviceConfig) -> Self {
        Self {
            store,
            generator: client.map(|c| AdviceGenerator::new(c, config.max_tokens, &config.currency)),
            policy: StalenessPolicy::from_config(config),
            locks: UserLocks::new(),
            timeout: config.generator_timeout(),
        }
    }

    /// Override the generator timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Advice for the user's current month
    pub async fn get_advice(&self, user_id: &str) -> Result<AdviceOutcome> {
        self.get_advice_for_period(user_id, PeriodKey::current()).await
    }

    /// Aggregate `period`, store the profile and return advice for it
    pub async fn get_advice_for_period(
        &self,
        user_id: &str,
        period: PeriodKey,
    ) -> Result<AdviceOutcome> {
        let transactions = self.store.query_transactions(user_id, period)?;

        if transactions.is_empty() {
            let has_cached = self
                .store
                .get_cache_entry(user_id)?
                .is_some_and(|e| e.has_advice());
            if !has_cached {
                debug!(user_id = %user_id, period = %period, "No data, returning onboarding advice");
                return Ok(AdviceOutcome {
                    advice: ONBOARDING_ADVICE.to_string(),
                    source: AdviceSource::NoData,
                    profile: None,
                    degradation: None,
                    state: None,
                });
            }
        }

        let aggregation = aggregate(user_id, &transactions, period);
        self.store.upsert_profile(&aggregation.profile)?;
        info!(
            user_id = %user_id,
            period = %period,
            transactions = transactions.len(),
            "Profile updated"
        );

        self.get_or_generate(user_id, &aggregation.profile).await
    }

    /// Reuse or regenerate the cached advice for `profile`
    pub async fn get_or_generate(
        &self,
        user_id: &str,
        profile: &FinancialProfile,
    ) -> Result<AdviceOutcome> {
        let lock = self.locks.lock_for(user_id);
        let _guard = lock.lock().await;

        let snapshot = profile.snapshot();
        let entry = self.store.get_cache_entry(user_id)?;
        let state = self.policy.evaluate(entry.as_ref(), &snapshot, Utc::now());
        debug!(user_id = %user_id, reason = state.reason(), "Cache decision");

        if state.decision() == Decision::Reuse {
            if let Some(text) = entry.as_ref().and_then(|e| e.advice_text.clone()) {
                return Ok(AdviceOutcome {
                    advice: text,
                    source: AdviceSource::Cache,
                    profile: Some(snapshot),
                    degradation: None,
                    state: Some(state),
                });
            }
        }

        let context = AdviceContext {
            previous: self
                .store
                .get_profile(user_id, snapshot.period_key.previous())?
                .map(|p| p.snapshot()),
            alert_summary: entry.as_ref().and_then(|e| e.alert_summary.clone()),
            previous_advice: entry.as_ref().and_then(|e| e.advice_text.clone()),
        };

        let text = match self.generate(&snapshot, &context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Advice generation failed, using fallback");
                return Ok(AdviceOutcome {
                    advice: fallback_advice(&snapshot),
                    source: AdviceSource::Error,
                    profile: Some(snapshot),
                    degradation: Some(Degradation::GeneratorUnavailable),
                    state: Some(state),
                });
            }
        };

        let new_entry = AdviceCacheEntry {
            user_id: user_id.to_string(),
            context_hash: Some(snapshot.context_hash()),
            advice_text: Some(text.clone()),
            last_profile_snapshot: Some(snapshot.clone()),
            last_generated_at: Some(Utc::now()),
            alert_summary: None,
        };

        if let Err(e) = self.store.upsert_cache_entry(&new_entry) {
            error!(user_id = %user_id, error = %e, "Failed to store generated advice");
            return Ok(AdviceOutcome {
                advice: text,
                source: AdviceSource::Error,
                profile: Some(snapshot),
                degradation: Some(Degradation::NotPersisted),
                state: Some(state),
            });
        }

        info!(user_id = %user_id, reason = state.reason(), "Advice regenerated");
        Ok(AdviceOutcome {
            advice: text,
            source: AdviceSource::Generated,
            profile: Some(snapshot),
            degradation: None,
            state: Some(state),
        })
    }

    async fn generate(&self, snapshot: &ProfileSnapshot, context: &AdviceContext) -> Result<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::Generator("no text generator configured".to_string()))?;

        match tokio::time::timeout(self.timeout, generator.generate(snapshot, context)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Generator(format!(
                "timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{NewTransaction, TransactionType};
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use rust_decimal::Decimal;

    fn period() -> PeriodKey {
        "2025-03".parse().unwrap()
    }

    fn seed(db: &Database, amount: i64, tx_type: TransactionType, day: u32) {
        db.insert_transaction(&NewTransaction {
            user_id: "u1".to_string(),
            amount: Decimal::from(amount),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            tx_type,
            category: "Food".to_string(),
            description: "seed".to_string(),
            counterparty: None,
        })
        .unwrap();
    }

    fn advisor(db: &Database, mock: &MockBackend) -> Advisor {
        Advisor::new(
            db.clone(),
            Some(AIClient::Mock(mock.clone())),
            &AdviceConfig::default(),
        )
    }

    #[test]
    fn test_user_locks_are_shared_per_user() {
        let locks = UserLocks::new();
        let a = locks.lock_for("u1");
        let b = locks.lock_for("u1");
        let c = locks.lock_for("u2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_user_locks_drop_idle_users() {
        let locks = UserLocks::new();
        for i in 0..100 {
            drop(locks.lock_for(&format!("user-{}", i)));
        }
        assert!(locks.len() <= 1);

        let held = locks.lock_for("busy");
        let _guard = held.lock().await;
        let idle = locks.lock_for("idle");
        drop(idle);
        locks.lock_for("other");
        assert_eq!(locks.len(), 2);

        // a held user keeps the same mutex across lookups
        assert!(Arc::ptr_eq(&held, &locks.lock_for("busy")));
        assert!(locks.lock_for("busy").try_lock().is_err());
    }

    #[test]
    fn test_source_serializes_none() {
        assert_eq!(serde_json::to_string(&AdviceSource::NoData).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&AdviceSource::Cache).unwrap(), "\"cache\"");
    }

    #[tokio::test]
    async fn test_first_request_generates_then_reuses() {
        let db = Database::in_memory().unwrap();
        seed(&db, 5000, TransactionType::Income, 1);
        seed(&db, 1000, TransactionType::Expense, 2);
        let mock = MockBackend::new().with_response("Keep going.");
        let advisor = advisor(&db, &mock);

        let first = advisor.get_advice_for_period("u1", period()).await.unwrap();
        assert_eq!(first.source, AdviceSource::Generated);
        assert_eq!(first.state, Some(CacheState::NoEntry));
        assert_eq!(first.advice, "Keep going.");

        let second = advisor.get_advice_for_period("u1", period()).await.unwrap();
        assert_eq!(second.source, AdviceSource::Cache);
        assert_eq!(second.advice, "Keep going.");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_data_returns_onboarding() {
        let db = Database::in_memory().unwrap();
        let mock = MockBackend::new();
        let advisor = advisor(&db, &mock);

        let outcome = advisor.get_advice_for_period("u1", period()).await.unwrap();
        assert_eq!(outcome.source, AdviceSource::NoData);
        assert_eq!(outcome.advice, ONBOARDING_ADVICE);
        assert!(outcome.profile.is_none());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_generator_failure_falls_back_without_touching_cache() {
        let db = Database::in_memory().unwrap();
        seed(&db, 1000, TransactionType::Income, 1);
        seed(&db, 1200, TransactionType::Expense, 2);
        let mock = MockBackend::new().failing();
        let advisor = advisor(&db, &mock);

        let outcome = advisor.get_advice_for_period("u1", period()).await.unwrap();
        assert_eq!(outcome.source, AdviceSource::Error);
        assert_eq!(outcome.degradation, Some(Degradation::GeneratorUnavailable));
        assert!(outcome.advice.contains("exceed your income"));
        assert!(db.get_cache_entry("u1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_without_client_falls_back() {
        let db = Database::in_memory().unwrap();
        seed(&db, 1000, TransactionType::Income, 1);
        let advisor: Advisor = Advisor::new(db.clone(), None, &AdviceConfig::default());
        assert!(!advisor.has_generator());

        let outcome = advisor.get_advice_for_period("u1", period()).await.unwrap();
        assert_eq!(outcome.source, AdviceSource::Error);
        assert!(outcome.is_degraded());
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let db = Database::in_memory().unwrap();
        seed(&db, 1000, TransactionType::Income, 1);
        let mock = MockBackend::new().with_delay(std::time::Duration::from_millis(500));
        let advisor = advisor(&db, &mock).with_timeout(std::time::Duration::from_millis(20));

        let outcome = advisor.get_advice_for_period("u1", period()).await.unwrap();
        assert_eq!(outcome.degradation, Some(Degradation::GeneratorUnavailable));
        assert!(db.get_cache_entry("u1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prompt_carries_alert_summary_and_previous_advice() {
        let db = Database::in_memory().unwrap();
        seed(&db, 1000, TransactionType::Income, 1);
        seed(&db, 500, TransactionType::Expense, 2);
        let snapshot = aggregate("u1", &db.transactions_for_period("u1", period()).unwrap(), period())
            .profile
            .snapshot();
        db.upsert_cache_entry(&AdviceCacheEntry {
            user_id: "u1".to_string(),
            context_hash: None,
            advice_text: Some("Old advice".to_string()),
            last_profile_snapshot: Some(snapshot),
            last_generated_at: Some(Utc::now() - ChronoDuration::days(10)),
            alert_summary: None,
        })
        .unwrap();
        db.set_alert_summary("u1", "Savings Milestone").unwrap();

        let mock = MockBackend::new().with_response("New advice");
        let outcome = advisor(&db, &mock)
            .get_advice_for_period("u1", period())
            .await
            .unwrap();
        assert_eq!(outcome.state, Some(CacheState::StaleByTime));
        assert_eq!(outcome.advice, "New advice");

        let prompt = mock.last_prompt().unwrap();
        assert!(prompt.contains("Savings Milestone"));
        assert!(prompt.contains("Old advice"));

        let entry = db.get_cache_entry("u1").unwrap().unwrap();
        assert_eq!(entry.alert_summary.as_deref(), Some("Savings Milestone"));
    }
}
