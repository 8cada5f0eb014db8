use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use leadgraph_common::{CallOutcome, EngineError, LeadProfile};

use crate::AppState;

#[derive(Deserialize)]
pub struct RecallQuery {
    /// Soft retrieval budget in milliseconds. On expiry the engine returns
    /// whatever partial knowledge it has assembled.
    timeout_ms: Option<u64>,
}

/// POST /api/learn — ingest one completed call's outcome.
pub async fn api_learn(
    State(state): State<Arc<AppState>>,
    Json(outcome): Json<CallOutcome>,
) -> impl IntoResponse {
    match state.learn.learn_from_call(&outcome).await {
        Ok(receipt) => (StatusCode::OK, Json(serde_json::json!(receipt))),
        Err(e) => engine_error_response(e),
    }
}

/// POST /api/recall — assemble knowledge for a new lead.
pub async fn api_recall(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecallQuery>,
    Json(lead): Json<LeadProfile>,
) -> impl IntoResponse {
    let deadline = params.timeout_ms.map(Duration::from_millis);
    match state.recall.retrieve_knowledge(&lead, deadline).await {
        Ok(knowledge) => (StatusCode::OK, Json(serde_json::json!(knowledge))),
        Err(e) => engine_error_response(e),
    }
}

/// GET /api/analytics — dashboard rollups.
pub async fn api_analytics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.analytics.report().await {
        Ok(report) => (StatusCode::OK, Json(serde_json::json!(report))),
        Err(e) => {
            warn!("Analytics rollup failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "analytics unavailable" })),
            )
        }
    }
}

fn engine_error_response(e: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    match &e {
        EngineError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": msg })),
        ),
        EngineError::GraphWrite {
            step,
            conversation_id,
            ..
        } => {
            warn!("Ingestion failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "step": step,
                    "conversationId": conversation_id,
                })),
            )
        }
        _ => {
            warn!("Engine error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}
