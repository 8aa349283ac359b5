use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::http::error::ApiError;
use crate::http::state::AppState;
use crate::orchestrator::{ParallelOptions, SessionDetail, SessionHandle};
use crate::session::SessionSummary;
use super::{validate_prompt, validate_session_id};

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Deserialize)]
pub struct LaunchRequest {
    pub prompt: String,
    pub session_id: Option<String>,
    /// Parallel delegation only
    pub preset: Option<String>,
    /// Parallel delegation only
    #[serde(default)]
    pub agents: Vec<String>,
}

#[derive(Serialize)]
pub struct LaunchResponse {
    pub session_id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct StopResponse {
    pub session_id: String,
    pub message: String,
}

/// GET /api/sessions - List active sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.orchestrator.list_active_sessions(),
    })
}

/// GET /api/sessions/{id} - Get one active session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    validate_session_id(&id)?;

    state
        .orchestrator
        .get_session(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Session {} not found", id)))
}

/// POST /api/sessions/supervision - Launch a supervised single agent
pub async fn launch_supervision(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LaunchRequest>,
) -> Result<(StatusCode, Json<LaunchResponse>), ApiError> {
    validate_prompt(&req.prompt)?;
    let handle = state.orchestrator.start_supervision(&req.prompt, req.session_id)?;
    Ok(launched(handle, "Supervision session launched"))
}

/// POST /api/sessions/parallel - Launch a multi-persona delegation
pub async fn launch_parallel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LaunchRequest>,
) -> Result<(StatusCode, Json<LaunchResponse>), ApiError> {
    validate_prompt(&req.prompt)?;
    let options = ParallelOptions {
        preset: req.preset,
        agents: req.agents,
    };
    let handle = state
        .orchestrator
        .start_parallel_agents(&req.prompt, req.session_id, options)?;
    Ok(launched(handle, "Parallel delegation session launched"))
}

/// POST /api/sessions/loop - Launch an iterative refinement loop
pub async fn launch_loop(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LaunchRequest>,
) -> Result<(StatusCode, Json<LaunchResponse>), ApiError> {
    validate_prompt(&req.prompt)?;
    let handle = state.orchestrator.start_infinite_loop(&req.prompt, req.session_id)?;
    Ok(launched(handle, "Refinement loop launched"))
}

/// POST /api/sessions/hivemind - Launch the architect/implementer/reviewer pipeline
pub async fn launch_hivemind(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LaunchRequest>,
) -> Result<(StatusCode, Json<LaunchResponse>), ApiError> {
    validate_prompt(&req.prompt)?;
    let handle = state.orchestrator.start_hivemind(&req.prompt, req.session_id)?;
    Ok(launched(handle, "Hivemind session launched"))
}

/// POST /api/sessions/{id}/stop - Stop a session and its processes
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StopResponse>, ApiError> {
    validate_session_id(&id)?;
    state.orchestrator.stop_session(&id)?;

    Ok(Json(StopResponse {
        session_id: id,
        message: "Session stopped".to_string(),
    }))
}

/// HTTP callers follow output through /api/events, so the per-session receiver is dropped
fn launched(handle: SessionHandle, message: &str) -> (StatusCode, Json<LaunchResponse>) {
    tracing::info!("{} via HTTP: {}", message, handle.id);
    (
        StatusCode::CREATED,
        Json(LaunchResponse {
            session_id: handle.id,
            message: message.to_string(),
        }),
    )
}
