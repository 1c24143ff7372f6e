//! Financial advice with drift-aware caching
//!
//! - `policy`: decides whether cached advice is still usable
//! - `generator`: builds prompts and calls the text generator
//! - `fallback`: deterministic advice when generation fails
//! - `controller`: the `Advisor`, tying the above together per user
//! - `insight_cache`: cached explanations for individual alerts
//! - `contextual`: uncached insights over caller-supplied transactions

pub mod contextual;
pub mod controller;
pub mod fallback;
pub mod generator;
pub mod insight_cache;
pub mod policy;

pub use contextual::{contextual_insights, ContextualInsights, InsightReport, InsightStatus};
pub use controller::{AdviceOutcome, AdviceSource, Advisor, Degradation, UserLocks};
pub use fallback::{fallback_advice, ONBOARDING_ADVICE};
pub use generator::{AdviceContext, AdviceGenerator};
pub use insight_cache::{AlertExplainer, Explanation};
pub use policy::{CacheState, Decision, StalenessPolicy};
