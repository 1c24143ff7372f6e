//! Pesa Core Library
//!
//! Shared functionality for the Pesa personal finance advisor:
//! - Database access and migrations
//! - Transaction aggregation into per-month financial profiles
//! - Drift detection between profiles
//! - Cached, drift-aware advice with a deterministic fallback
//! - Threshold-based alert rules
//! - Pluggable text-generation backends (Ollama, OpenAI-compatible)

pub mod advisor;
pub mod aggregate;
pub mod ai;
pub mod config;
pub mod db;
pub mod drift;
pub mod error;
pub mod health;
pub mod models;
pub mod period;
pub mod rules;
pub mod store;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use advisor::{
    AdviceOutcome, AdviceSource, Advisor, AlertExplainer, CacheState, ContextualInsights,
    Degradation, StalenessPolicy,
};
pub use aggregate::{aggregate, Aggregation};
pub use ai::{AIClient, MockBackend, OllamaBackend, OpenAICompatibleBackend, TextGenerator};
pub use config::AdvisorConfig;
pub use db::Database;
pub use drift::{drift, MAX_DRIFT};
pub use error::{Error, Result};
pub use health::{health_score, HealthLevel, HealthReport};
pub use models::{
    AdviceCacheEntry, Alert, AlertKind, AlertSeverity, FinancialProfile, NewAlert,
    NewTransaction, ProfileSnapshot, Transaction, TransactionRecord, TransactionType,
};
pub use period::PeriodKey;
pub use rules::RuleEngine;
pub use store::AdvisorStore;
