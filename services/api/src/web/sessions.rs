//! services/api/src/web/sessions.rs
//!
//! Handlers for the `/study-sessions` resource. Every route runs behind
//! `require_auth`; the caller id arrives as a request extension.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_shield_core::{parse_id, CompleteSession, SessionState, StudySession, Task};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct TaskInput {
    pub name: String,
    /// Planned minutes for this task.
    pub duration: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub tasks: Vec<TaskInput>,
    pub planned_duration: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteSessionRequest {
    /// Minutes actually studied.
    pub actual_duration: u32,
    #[serde(default)]
    pub distractions_blocked: u32,
    pub notes: Option<String>,
}

/// A session together with its derived lifecycle state.
#[derive(Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: StudySession,
    pub state: SessionState,
}

impl From<StudySession> for SessionView {
    fn from(session: StudySession) -> Self {
        let state = session.state();
        Self { session, state }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's sessions, newest first.
#[utoipa::path(
    get,
    path = "/study-sessions",
    responses(
        (status = 200, description = "The caller's sessions"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
) -> ApiResult<Json<Vec<SessionView>>> {
    let sessions = state.sessions.list(caller).await?;
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

/// Start a new study session and make it the caller's current session.
#[utoipa::path(
    post,
    path = "/study-sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session started"),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.tasks.iter().any(|t| t.name.trim().is_empty()) {
        return Err(ApiError::BadRequest("Task names must not be empty".to_string()));
    }
    let tasks = req
        .tasks
        .into_iter()
        .map(|t| Task::new(t.name, t.duration))
        .collect();
    let session = state
        .sessions
        .start(caller, tasks, req.planned_duration)
        .await?;
    Ok((StatusCode::CREATED, Json(SessionView::from(session))))
}

/// The caller's most recent session that has not been completed, if any.
#[utoipa::path(
    get,
    path = "/study-sessions/last-active-session",
    responses(
        (status = 200, description = "The open session, or null"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn last_active_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
) -> ApiResult<Json<Option<SessionView>>> {
    let session = state.sessions.last_active(caller).await?;
    Ok(Json(session.map(SessionView::from)))
}

#[utoipa::path(
    get,
    path = "/study-sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "The session"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_id(&id, "session")?;
    let session = state.sessions.get(caller, session_id).await?;
    Ok(Json(session.into()))
}

/// Record client liveness.
#[utoipa::path(
    post,
    path = "/study-sessions/{id}/heartbeat",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Heartbeat recorded"),
        (status = 400, description = "Session already completed"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn heartbeat_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_id(&id, "session")?;
    let session = state.sessions.heartbeat(caller, session_id).await?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    post,
    path = "/study-sessions/{id}/pause",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session paused"),
        (status = 400, description = "Already paused or completed"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_id(&id, "session")?;
    let session = state.sessions.pause(caller, session_id).await?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    post,
    path = "/study-sessions/{id}/resume",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session resumed"),
        (status = 400, description = "Not paused or already completed"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_id(&id, "session")?;
    let session = state.sessions.resume(caller, session_id).await?;
    Ok(Json(session.into()))
}

/// Close the session and fold its figures into the caller's ledger.
#[utoipa::path(
    post,
    path = "/study-sessions/{id}/complete",
    params(("id" = String, Path, description = "Session id")),
    request_body = CompleteSessionRequest,
    responses(
        (status = 200, description = "Completion summary"),
        (status = 400, description = "Session already completed"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn complete_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
    Json(req): Json<CompleteSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let session_id = parse_id(&id, "session")?;
    let summary = state
        .sessions
        .complete(
            caller,
            session_id,
            CompleteSession {
                actual_duration: req.actual_duration,
                distractions_blocked: req.distractions_blocked,
                notes: req.notes,
            },
        )
        .await?;
    Ok(Json(summary))
}
