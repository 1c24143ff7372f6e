//! Pesa Web Server
//!
//! Axum-based REST API for the Pesa personal finance advisor.
//!
//! - Cached advice with drift-aware regeneration
//! - Contextual insights and a financial health score
//! - Alert generation, listing and per-alert explanations
//! - Restrictive CORS policy and sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use pesa_core::ai::{AIClient, TextGenerator};
use pesa_core::config::AdvisorConfig;
use pesa_core::db::Database;
use pesa_core::{Advisor, AlertExplainer, RuleEngine};

mod handlers;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub advisor: Advisor,
    pub explainer: AlertExplainer,
    pub rules: RuleEngine,
    pub config: AdvisorConfig,
    pub ai: Option<AIClient>,
}

impl AppState {
    pub fn new(db: Database, ai: Option<AIClient>, config: AdvisorConfig) -> Self {
        Self {
            advisor: Advisor::new(db.clone(), ai.clone(), &config.advice),
            explainer: AlertExplainer::new(db.clone(), ai.clone(), config.insights.clone())
                .with_timeout(config.advice.generator_timeout()),
            rules: RuleEngine::from_config(&config),
            db,
            config,
            ai,
        }
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
///
/// The text generator comes from the environment and the advisor config
/// from the override file or embedded defaults.
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let ai = AIClient::from_env();
    if let Some(ref client) = ai {
        info!(
            "AI backend configured: {} (model: {})",
            client.host(),
            client.model()
        );
    } else {
        info!("ℹ️  AI backend not configured (set OLLAMA_HOST to enable generated advice)");
    }

    let advisor_config = AdvisorConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load advisor config, using defaults: {}", e);
        AdvisorConfig::default()
    });

    create_router_with_state(Arc::new(AppState::new(db, ai, advisor_config)), config)
}

/// Create the application router around prepared state (for testing)
pub fn create_router_with_state(state: Arc<AppState>, config: ServerConfig) -> Router {
    let api_routes = Router::new()
        // Advice
        .route("/advisor/:user_id", get(handlers::get_advice))
        .route(
            "/advisor/:user_id/contextual-insights",
            post(handlers::contextual_insights),
        )
        .route("/advisor/:user_id/health", get(handlers::financial_health))
        // Alerts
        .route("/alerts/read/:id", post(handlers::mark_alert_read))
        .route("/alerts/:user_id", get(handlers::list_alerts))
        .route("/alerts/:user_id/generate", post(handlers::generate_alerts))
        .route("/alerts/:user_id/:id/explain", post(handlers::explain_alert));

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection().await;

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (advice will use fallbacks)",
                    client.host()
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured (set OLLAMA_HOST to enable generated advice)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        match err.downcast_ref::<pesa_core::Error>() {
            Some(pesa_core::Error::Validation(msg)) => Self::bad_request(msg),
            Some(pesa_core::Error::NotFound(msg)) => Self::not_found(msg),
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(err),
            },
        }
    }
}
