//! Test utilities for pesa-core
//!
//! Provides a mock text-generation server speaking both the Ollama
//! (`/api/generate`) and OpenAI (`/v1/chat/completions`) protocols, so the
//! real HTTP backends can be exercised without a running model.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Clone)]
struct MockState {
    response: String,
    fail: bool,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Mock Ollama / OpenAI-compatible server for tests
pub struct MockOllamaServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start a server that answers every completion with `response`
    pub async fn start(response: &str) -> Self {
        Self::spawn(response.to_string(), false).await
    }

    /// Start a server whose completion endpoints return 500
    pub async fn failing() -> Self {
        Self::spawn(String::new(), true).await
    }

    async fn spawn(response: String, fail: bool) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            response,
            fail,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received by the completion endpoints, in order
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{"name": "llama3.2:latest", "modified_at": "2024-01-01T00:00:00Z"}]
    }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "gpt-4o-mini", "object": "model"}]}))
}

async fn handle_generate(State(state): State<MockState>, Json(request): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(request.clone());
    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
    }
    Json(json!({
        "model": request["model"],
        "response": state.response,
        "done": true,
    }))
    .into_response()
}

async fn handle_chat(State(state): State<MockState>, Json(request): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(request.clone());
    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
    }
    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request["model"],
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.response},
            "finish_reason": "stop",
        }],
    }))
    .into_response()
}
