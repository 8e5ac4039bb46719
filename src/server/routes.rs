use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::error::ApiError;
use super::sse::to_sse_response;
use crate::agents::{list_agents, AgentSummary};
use crate::gateway::{ChatOutcome, ConnectionTest, Gateway, GatewayStatus, ModelsListing};
use crate::models::{ChatRequest, GenerateRequest};

/// Header set by the upstream identity layer
pub const USER_HEADER: &str = "x-user-id";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/agents", get(agents))
        .route("/api/llm/status", get(status))
        .route("/api/llm/models", get(models))
        .route("/api/llm/test", post(test_connection))
        .route("/api/llm/generate", post(generate))
        .route("/api/llm/generate/stream", post(generate_stream))
        .route("/api/chat", post(chat))
        .with_state(AppState { gateway })
}

fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn agents() -> Json<Vec<AgentSummary>> {
    Json(list_agents())
}

async fn status(State(state): State<AppState>) -> Json<GatewayStatus> {
    Json(state.gateway.status().await)
}

#[derive(Debug, Default, Deserialize)]
struct ModelsQuery {
    #[serde(default)]
    refresh: bool,
}

async fn models(State(state): State<AppState>, Query(query): Query<ModelsQuery>) -> Json<ModelsListing> {
    Json(state.gateway.models(query.refresh).await)
}

async fn test_connection(State(state): State<AppState>) -> Json<ConnectionTest> {
    Json(state.gateway.test_connection().await)
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = user_id(&headers)?;
    let response = state.gateway.generate(&user, &request).await?;
    Ok(Json(json!({ "response": response })))
}

async fn generate_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    let user = user_id(&headers)?;
    let rx = state.gateway.generate_stream(&user, &request)?;
    debug!("Streaming generation for {}", user);
    Ok(to_sse_response(rx).into_response())
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let user = user_id(&headers)?;
    let outcome = state.gateway.chat(&user, &request).await?;
    Ok(Json(outcome))
}
