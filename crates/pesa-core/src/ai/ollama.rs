//! Ollama backend implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::{clean_completion, TextGenerator};

/// Ollama backend using the `/api/generate` endpoint
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl TextGenerator for OllamaBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: max_tokens,
                temperature: 0.7,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Generator(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        debug!(model = %self.model, "Ollama response: {}", ollama_response.response);

        clean_completion(&ollama_response.response)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockOllamaServer;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
        assert_eq!(backend.with_model("gemma3").model(), "gemma3");
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockOllamaServer::start("  Save 10% of every paycheck.  ").await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        let text = backend.complete("advice please", 300).await.unwrap();
        assert_eq!(text, "Save 10% of every paycheck.");
        assert!(backend.health_check().await);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["options"]["num_predict"], 300);
        assert_eq!(requests[0]["stream"], false);
    }

    #[tokio::test]
    async fn test_server_error_is_generator_error() {
        let server = MockOllamaServer::failing().await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        let err = backend.complete("advice please", 300).await.unwrap_err();
        assert!(matches!(err, Error::Generator(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(backend.complete("hi", 10).await.is_err());
        assert!(!backend.health_check().await);
    }
}
