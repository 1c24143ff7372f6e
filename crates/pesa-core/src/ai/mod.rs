//! Pluggable text-generation backends
//!
//! Advice and alert insights are produced by an external text generator. The
//! core only needs a single operation from it: complete a prompt within a
//! token budget.
//!
//! # Architecture
//!
//! - `TextGenerator` trait: the interface the advisor depends on
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, openai_compatible, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Default model name (default: llama3.2)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

mod mock;
mod ollama;
mod openai_compatible;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Interface for text-generation backends
///
/// Backends must be Send + Sync so a single client can be shared across
/// request handlers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`, producing at most roughly `max_tokens` tokens
    ///
    /// Fails with `Error::Generator` (or `Error::Http`) when the provider
    /// errors or returns nothing usable.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, hosted APIs)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use. Returns None if
    /// the required environment variables are not set; callers then run with
    /// fallback advice only.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl TextGenerator for AIClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.complete(prompt, max_tokens).await,
            AIClient::OpenAICompatible(b) => b.complete(prompt, max_tokens).await,
            AIClient::Mock(b) => b.complete(prompt, max_tokens).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Trim a completion and reject empty output
pub(crate) fn clean_completion(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(crate::error::Error::Generator(
            "Generator returned an empty response".to_string(),
        ));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_complete() {
        let client = AIClient::mock();
        let text = client.complete("Give me advice", 50).await.unwrap();
        assert!(!text.is_empty());
    }

    #[test]
    fn test_clean_completion() {
        assert_eq!(clean_completion("  hi \n").unwrap(), "hi");
        assert!(clean_completion("   ").is_err());
    }
}
