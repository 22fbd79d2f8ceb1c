//! Gameplay routes: player actions, undo, history, and the world journal.

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use loreweaver_core::error::DomainError;
use loreweaver_core::model::{Entry, EntryKind, Message};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{session_id}/action.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// The player's free-text action.
    pub action: String,
    /// BCP 47 language tag for the narration; defaults to English.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_owned()
}

/// Response body for POST /{session_id}/action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// The assistant narration for this turn.
    pub response: String,
}

/// POST /{session_id}/action
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn process_action(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let action = request.action.trim();
    if action.is_empty() {
        return Err(DomainError::Validation("action must not be empty".to_owned()).into());
    }

    let response = state
        .engine
        .process_action(session_id, action, &request.language)
        .await?;

    Ok(Json(ActionResponse { response }))
}

/// Response body for POST /{session_id}/undo.
#[derive(Debug, Serialize)]
pub struct UndoResponse {
    /// Whether a turn was reversed.
    pub success: bool,
}

/// POST /{session_id}/undo
#[instrument(skip(state), fields(session_id = %session_id))]
async fn undo_turn(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<UndoResponse>, ApiError> {
    let undone = state.engine.undo(session_id).await?;
    if !undone {
        return Err(ApiError::NothingToUndo);
    }

    info!("turn undone");
    Ok(Json(UndoResponse { success: true }))
}

/// Pagination parameters for GET /{session_id}/history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Newest messages to skip before taking the window.
    #[serde(default)]
    pub offset: i64,
    /// Window size.
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    20
}

/// GET /{session_id}/history
///
/// Returns the newest `limit` messages after skipping `offset` newer ones,
/// ordered chronologically.
#[instrument(skip(state), fields(session_id = %session_id))]
async fn message_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    state
        .store
        .get_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))?;

    let messages = state
        .store
        .recent_messages(session_id, params.offset.max(0), params.limit.clamp(0, 500))
        .await?;

    Ok(Json(messages))
}

/// Filter parameters for GET /{session_id}/journal.
#[derive(Debug, Deserialize)]
pub struct JournalParams {
    /// Restrict to one entry kind; all kinds when absent.
    pub kind: Option<String>,
}

/// GET /{session_id}/journal
#[instrument(skip(state), fields(session_id = %session_id))]
async fn journal_entries(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<JournalParams>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    state
        .store
        .get_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))?;

    let kind = params
        .kind
        .as_deref()
        .map(str::parse::<EntryKind>)
        .transpose()?;

    let mut entries = state.store.entries(session_id).await?;
    if let Some(kind) = kind {
        entries.retain(|e| e.kind == kind);
    }

    Ok(Json(entries))
}

/// Returns the router for gameplay endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{session_id}/action", post(process_action))
        .route("/{session_id}/undo", post(undo_turn))
        .route("/{session_id}/history", get(message_history))
        .route("/{session_id}/journal", get(journal_entries))
}
