//! Staleness policy for cached advice

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::AdviceConfig;
use crate::drift::drift;
use crate::models::{AdviceCacheEntry, ProfileSnapshot};

/// State of a user's cached advice relative to their current profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    NoEntry,
    Fresh,
    StaleByTime,
    StaleByDrift,
}

/// What to do with the cached advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Reuse,
    Regenerate,
}

impl CacheState {
    pub fn decision(&self) -> Decision {
        match self {
            CacheState::Fresh => Decision::Reuse,
            CacheState::NoEntry | CacheState::StaleByTime | CacheState::StaleByDrift => {
                Decision::Regenerate
            }
        }
    }

    /// Short reason used in logs
    pub fn reason(&self) -> &'static str {
        match self {
            CacheState::NoEntry => "first time",
            CacheState::Fresh => "fresh",
            CacheState::StaleByTime => "time",
            CacheState::StaleByDrift => "drift",
        }
    }
}

/// Time- and drift-based invalidation
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    stale_after: Duration,
    drift_threshold: f64,
}

impl StalenessPolicy {
    pub fn new(stale_days: i64, drift_threshold: f64) -> Self {
        Self {
            stale_after: Duration::days(stale_days),
            drift_threshold,
        }
    }

    pub fn from_config(config: &AdviceConfig) -> Self {
        Self::new(config.stale_days, config.drift_threshold)
    }

    /// Classify the cache entry, checking existence, then age, then drift
    ///
    /// Advice with no usable generation time is treated as expired.
    pub fn evaluate(
        &self,
        entry: Option<&AdviceCacheEntry>,
        current: &ProfileSnapshot,
        now: DateTime<Utc>,
    ) -> CacheState {
        let Some(entry) = entry.filter(|e| e.has_advice()) else {
            return CacheState::NoEntry;
        };

        match entry.last_generated_at {
            Some(generated_at) if now - generated_at <= self.stale_after => {}
            _ => return CacheState::StaleByTime,
        }

        if let Some(snapshot) = &entry.last_profile_snapshot {
            if drift(Some(snapshot), current) > self.drift_threshold {
                return CacheState::StaleByDrift;
            }
        }

        CacheState::Fresh
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::from_config(&AdviceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn snapshot(expenses: i64) -> ProfileSnapshot {
        ProfileSnapshot {
            period_key: "2025-03".parse().unwrap(),
            total_income: Decimal::from(5000),
            total_expenses: Decimal::from(expenses),
            savings: Decimal::from(5000 - expenses),
            savings_rate: (5000 - expenses) as f64 / 5000.0,
            top_category: Some("Rent".to_string()),
        }
    }

    fn entry(expenses: i64, age_days: i64, now: DateTime<Utc>) -> AdviceCacheEntry {
        AdviceCacheEntry {
            user_id: "u1".to_string(),
            context_hash: None,
            advice_text: Some("Keep it up".to_string()),
            last_profile_snapshot: Some(snapshot(expenses)),
            last_generated_at: Some(now - Duration::days(age_days)),
            alert_summary: None,
        }
    }

    #[test]
    fn test_no_entry_regenerates() {
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(None, &snapshot(1000), Utc::now());
        assert_eq!(state, CacheState::NoEntry);
        assert_eq!(state.decision(), Decision::Regenerate);
        assert_eq!(state.reason(), "first time");
    }

    #[test]
    fn test_summary_only_entry_counts_as_missing() {
        let now = Utc::now();
        let mut e = entry(1000, 1, now);
        e.advice_text = None;
        let policy = StalenessPolicy::default();
        assert_eq!(policy.evaluate(Some(&e), &snapshot(1000), now), CacheState::NoEntry);
    }

    #[test]
    fn test_old_entry_is_stale_even_without_drift() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(Some(&entry(1000, 8, now)), &snapshot(1000), now);
        assert_eq!(state, CacheState::StaleByTime);
    }

    #[test]
    fn test_entry_exactly_stale_days_old_is_fresh() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(Some(&entry(1000, 7, now)), &snapshot(1000), now);
        assert_eq!(state, CacheState::Fresh);

        let just_over = AdviceCacheEntry {
            last_generated_at: Some(now - Duration::days(7) - Duration::seconds(1)),
            ..entry(1000, 7, now)
        };
        let state = policy.evaluate(Some(&just_over), &snapshot(1000), now);
        assert_eq!(state, CacheState::StaleByTime);
    }

    #[test]
    fn test_missing_timestamp_is_stale_by_time() {
        let now = Utc::now();
        let mut e = entry(1000, 0, now);
        e.last_generated_at = None;
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(Some(&e), &snapshot(1000), now);
        assert_eq!(state, CacheState::StaleByTime);
        assert_eq!(state.decision(), Decision::Regenerate);
    }

    #[test]
    fn test_drift_over_threshold_regenerates() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(Some(&entry(1000, 1, now)), &snapshot(1200), now);
        assert_eq!(state, CacheState::StaleByDrift);
    }

    #[test]
    fn test_drift_at_threshold_is_fresh() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(Some(&entry(1000, 1, now)), &snapshot(1100), now);
        assert_eq!(state, CacheState::Fresh);
        assert_eq!(state.decision(), Decision::Reuse);
    }

    #[test]
    fn test_zero_baseline_always_drifts() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let state = policy.evaluate(Some(&entry(0, 1, now)), &snapshot(0), now);
        assert_eq!(state, CacheState::StaleByDrift);
    }
}
