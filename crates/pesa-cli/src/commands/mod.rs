//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `advisor` - Profile, advice, contextual insights and health score
//! - `alerts` - Alert generation, listing, read state and explanations
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `serve` - Web server command
//! - `transactions` - Manual entry and listing

pub mod advisor;
pub mod alerts;
pub mod core;
pub mod serve;
pub mod transactions;

// Re-export command functions for main.rs
pub use advisor::*;
pub use alerts::*;
pub use core::*;
pub use serve::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
