//! Mock backend for testing
//!
//! Returns predictable completions without a running model. Responses,
//! failures and latency are configurable, and calls are counted so tests can
//! assert how often the generator was reached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::TextGenerator;

/// Mock text generator
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    response: Option<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            response: None,
            fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an unhealthy mock backend whose completions fail
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            fail: true,
            ..Self::new()
        }
    }

    /// Always answer with `response`
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }

    /// Fail every completion with `Error::Generator`
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completions requested so far (shared across clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TextGenerator for MockBackend {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(Error::Generator("mock generator failure".to_string()));
        }

        Ok(match &self.response {
            Some(response) => response.clone(),
            None => format!(
                "Mock advice #{}: review your top spending category and set a weekly budget. ({} chars of context)",
                n,
                prompt.len()
            ),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
