//! Error types for Pesa

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Text generation failed: {0}")]
    Generator(String),
}

impl Error {
    /// Whether this error came from the persistence layer
    ///
    /// Persistence failures are the only ones surfaced to callers as hard
    /// failures; everything else degrades to fallback output.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Pool(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
