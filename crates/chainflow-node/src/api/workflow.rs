//! Workflow API endpoints.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chainflow_core::ChainflowError;
use chainflow_session::{PollOutcome, SessionView, StartedWorkflow};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::state::AppState;

/// Longest accepted long-poll timeout.
const MAX_POLL_TIMEOUT_SECS: u64 = 120;

/// Request to start a workflow.
#[derive(Debug, Deserialize)]
pub struct StartWorkflowRequest {
    /// The natural-language user request.
    pub message: String,
}

/// Request to submit a signature for a suspended workflow.
#[derive(Debug, Deserialize)]
pub struct SubmitSignatureRequest {
    pub signature: String,
}

/// Acknowledgement of a submitted signature.
#[derive(Debug, Serialize)]
pub struct SubmitSignatureResponse {
    pub session_id: Uuid,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    /// Timeout in seconds; defaults to 30.
    pub timeout: Option<u64>,
}

/// Start a new workflow from a user message.
pub async fn start_workflow(
    State(state): State<AppState>,
    Json(req): Json<StartWorkflowRequest>,
) -> Result<(StatusCode, Json<StartedWorkflow>), (StatusCode, String)> {
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }
    let started = state.manager.start(&req.message).await;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Get a session's status.
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let view = state.manager.status(id).await.map_err(error_response)?;
    Ok(Json(view))
}

/// Submit the externally obtained signature.
pub async fn submit_signature(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitSignatureRequest>,
) -> Result<Json<SubmitSignatureResponse>, (StatusCode, String)> {
    if req.signature.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "signature is required".to_string()));
    }

    state
        .manager
        .submit_signature(id, &req.signature)
        .await
        .map_err(error_response)?;

    Ok(Json(SubmitSignatureResponse {
        session_id: id,
        status: "processing".to_string(),
        message: "signature submitted, workflow resuming".to_string(),
    }))
}

/// Long-poll the session's next update.
pub async fn poll_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PollQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let timeout_secs = query.timeout.unwrap_or(30).min(MAX_POLL_TIMEOUT_SECS);
    let outcome = state
        .manager
        .poll(id, Duration::from_secs(timeout_secs))
        .await
        .map_err(error_response)?;

    let body = match outcome {
        PollOutcome::Update(update) => json!({ "session_id": id, "update": update }),
        PollOutcome::Timeout => json!({ "session_id": id, "timeout": true }),
        PollOutcome::Cancelled => json!({ "session_id": id, "cancelled": true }),
    };
    Ok(Json(body))
}

/// Cancel a session.
pub async fn cancel_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.manager.cancel(id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

fn error_response(err: ChainflowError) -> (StatusCode, String) {
    let status = match &err {
        ChainflowError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ChainflowError::InvalidSessionState { .. } => StatusCode::CONFLICT,
        ChainflowError::MalformedSignature { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
