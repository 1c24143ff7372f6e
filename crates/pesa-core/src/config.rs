//! Advisor configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/pesa/config/advisor.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Override files may be partial; missing keys keep their default values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/advisor.toml");

/// Advice caching and generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    /// Cached advice older than this many days is regenerated
    pub stale_days: i64,
    /// Relative expense drift (fraction) above which advice is regenerated
    pub drift_threshold: f64,
    /// Timeout for a single generator call
    pub generator_timeout_secs: u64,
    /// Token budget for generated advice
    pub max_tokens: u32,
    /// Currency label used in prompts and alert messages
    pub currency: String,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            stale_days: 7,
            drift_threshold: 0.10,
            generator_timeout_secs: 10,
            max_tokens: 300,
            currency: "KES".to_string(),
        }
    }
}

impl AdviceConfig {
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

/// Alert-insight cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightCacheConfig {
    pub refresh_days: i64,
    pub drift_threshold: f64,
    pub max_tokens: u32,
    pub summary_size: usize,
}

impl Default for InsightCacheConfig {
    fn default() -> Self {
        Self {
            refresh_days: 30,
            drift_threshold: 0.3,
            max_tokens: 120,
            summary_size: 10,
        }
    }
}

/// Alert rule thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub overspend_ratio: Decimal,
    pub no_income_expense_limit: Decimal,
    pub milestone_ratio: Decimal,
    pub low_savings_rate: f64,
    pub large_transaction: Decimal,
    pub rising_trend_months: usize,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            overspend_ratio: Decimal::new(8, 1),
            no_income_expense_limit: Decimal::from(1000),
            milestone_ratio: Decimal::new(3, 1),
            low_savings_rate: 0.10,
            large_transaction: Decimal::from(5000),
            rising_trend_months: 2,
        }
    }
}

/// Complete advisor configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub advice: AdviceConfig,
    pub insights: InsightCacheConfig,
    pub rules: RuleThresholds,
}

impl AdvisorConfig {
    /// Load config with override resolution
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::override_path() {
            if path.exists() {
                info!("Loading advisor config override from {:?}", path);
                return Self::from_file(&path);
            }
        }

        debug!("Using embedded advisor config");
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Parse config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Path of the user override file (~/.local/share/pesa/config/advisor.toml)
    pub fn override_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("pesa").join("config").join("advisor.toml"))
    }
}
