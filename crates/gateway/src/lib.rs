//! HTTP API gateway for Optimus.
//!
//! Exposes the agent (single-shot and streaming), document ingestion and
//! retrieval search under a configurable prefix, plus a health check.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use optimus_agent::AgentService;
use optimus_config::GatewayConfig;
use optimus_rag::RetrievalEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentService>,
    pub retrieval: Arc<RetrievalEngine>,
    /// Used when a query names no provider
    pub default_provider: String,
    /// Used when a query names no model
    pub default_model: String,
}

pub type SharedState = Arc<GatewayState>;

/// Build the router: API routes under `config.api_prefix`, `/health` at
/// the root and inside the prefix.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let api = api_v1::api_router(state);
    let prefix = config.api_prefix.trim_end_matches('/');

    let router = Router::new().route("/health", get(health_handler));
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    };

    router
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS from configuration. `"*"` anywhere in the list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn serve(config: &GatewayConfig, state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(state, config);

    info!(addr = %addr, prefix = %config.api_prefix, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
