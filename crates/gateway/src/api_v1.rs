//! HTTP API v1.
//!
//! Endpoints (relative to the configured prefix, `/api/v1` by default):
//!
//! - `GET  /health`        : Liveness
//! - `POST /agent/query`   : Run a query, get the final answer
//! - `POST /agent/stream`  : Run a query, get a text/event-stream of frames
//! - `POST /rag/documents` : Upload a text document (multipart `file`)
//! - `POST /rag/search`    : Similarity search over indexed chunks

use axum::{
    Router,
    body::Body,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use optimus_core::error::AgentError;
use optimus_core::store::RetrievedChunk;
use optimus_rag::{MAX_TOP_K, MIN_TOP_K, RagError};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::SharedState;

/// Build the v1 API router. Nest this under the API prefix.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(crate::health_handler))
        .route("/agent/query", post(agent_query_handler))
        .route("/agent/stream", post(agent_stream_handler))
        .route("/rag/documents", post(upload_document_handler))
        .route("/rag/search", post(rag_search_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AgentQueryRequest {
    pub query: String,
    #[serde(default, alias = "provider")]
    pub model_provider: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentQueryResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RagSearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

fn default_top_k() -> i64 {
    5
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RagSearchResponse {
    pub results: Vec<RetrievedChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub document_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn agent_error(e: AgentError) -> ApiError {
    let status = match &e {
        AgentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::Configuration(_) => StatusCode::BAD_REQUEST,
        AgentError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    if status == StatusCode::BAD_GATEWAY {
        warn!(error = %e, "Agent run failed");
    }
    error(status, e.to_string())
}

fn rag_error(e: RagError) -> ApiError {
    let status = match &e {
        RagError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RagError::Upstream(_) | RagError::Store(_) => StatusCode::BAD_GATEWAY,
    };
    if status == StatusCode::BAD_GATEWAY {
        warn!(error = %e, "Retrieval request failed");
    }
    error(status, e.to_string())
}

impl AgentQueryRequest {
    fn target<'a>(&'a self, state: &'a crate::GatewayState) -> (&'a str, &'a str) {
        (
            self.model_provider.as_deref().unwrap_or(&state.default_provider),
            self.model_name.as_deref().unwrap_or(&state.default_model),
        )
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn agent_query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<AgentQueryRequest>,
) -> Result<Json<AgentQueryResponse>, ApiError> {
    let (provider, model) = payload.target(&state);
    info!(provider, model, "agent/query request");

    let message = state
        .agent
        .run_once(&payload.query, provider, model)
        .await
        .map_err(agent_error)?;
    Ok(Json(AgentQueryResponse { message }))
}

/// Errors before the feed opens are plain JSON error responses; once
/// streaming, a failure just ends the body.
async fn agent_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<AgentQueryRequest>,
) -> Result<Response, ApiError> {
    let (provider, model) = payload.target(&state);
    info!(provider, model, "agent/stream request");

    let rx = state
        .agent
        .run_streaming(&payload.query, provider, model)
        .await
        .map_err(agent_error)?;

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

async fn upload_document_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.txt").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}")))?;

        info!(filename = %filename, bytes = bytes.len(), "rag/documents upload");
        let document_id = state
            .retrieval
            .index_upload(&filename, content_type.as_deref(), &bytes)
            .await
            .map_err(rag_error)?;

        return Ok(Json(UploadResponse {
            status: "indexed".into(),
            document_id,
        }));
    }

    Err(error(StatusCode::UNPROCESSABLE_ENTITY, "Missing 'file' field"))
}

async fn rag_search_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RagSearchRequest>,
) -> Result<Json<RagSearchResponse>, ApiError> {
    if !(MIN_TOP_K as i64..=MAX_TOP_K as i64).contains(&payload.top_k) {
        return Err(error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("top_k must be between {MIN_TOP_K} and {MAX_TOP_K}"),
        ));
    }

    let results = state
        .retrieval
        .query(&payload.query, payload.top_k as usize)
        .await
        .map_err(rag_error)?;
    Ok(Json(RagSearchResponse { results }))
}
