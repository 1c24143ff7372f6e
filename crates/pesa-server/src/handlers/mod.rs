//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod advisor;
pub mod alerts;

// Re-export all handlers for use in router
pub use advisor::*;
pub use alerts::*;
