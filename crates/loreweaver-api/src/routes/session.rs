//! Session lifecycle routes: create, list, fetch, delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use loreweaver_core::error::DomainError;
use loreweaver_core::model::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Display name for the new session.
    pub name: String,
    /// Free-text starting premise.
    pub start_prompt: String,
}

/// Pagination parameters for GET /.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Rows to skip.
    #[serde(default)]
    pub offset: i64,
    /// Maximum rows to return.
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    100
}

/// POST /
#[instrument(skip(state, request))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name must not be empty".to_owned()).into());
    }

    let session = Session {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        start_prompt: request.start_prompt,
        summary: None,
        created_at: state.clock.now(),
    };

    info!(session_id = %session.id, "creating session");
    state.store.create_session(&session).await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /
#[instrument(skip(state))]
async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let sessions = state
        .store
        .list_sessions(params.offset.max(0), params.limit.clamp(0, 500))
        .await?;
    Ok(Json(sessions))
}

/// GET /{session_id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))?;
    Ok(Json(session))
}

/// Response body returned after a session is deleted.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Whether the deletion took effect.
    pub deleted: bool,
}

/// DELETE /{session_id}
#[instrument(skip(state))]
async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .store
        .get_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))?;

    info!(session_id = %session_id, "deleting session");
    state.store.delete_session(session_id).await?;

    Ok(Json(DeleteResponse { deleted: true }))
}

/// Returns the router for session lifecycle endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{session_id}", get(get_session).delete(delete_session))
}
