//! `/chat/history*` handlers (C7, §6): owner-scoped chat session reads.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use lorekeeper_core::model::{ChatSession, ChatSessionSummary};
use lorekeeper_core::traits::SessionStore;

use crate::auth_extractor::AuthenticatedCaller;
use crate::error_response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListHistoryQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct ListHistoryResponse {
    pub sessions: Vec<ChatSessionSummary>,
}

pub async fn list_history(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(q): Query<ListHistoryQuery>,
) -> Result<Json<ListHistoryResponse>, ApiError> {
    let owner = caller.require()?;
    let sessions = state.sessions.list_by_owner(owner, q.page, q.size).await?;
    Ok(Json(ListHistoryResponse { sessions }))
}

pub async fn get_history(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, ApiError> {
    let owner = caller.require()?;
    let session = state.sessions.get(&id).await?;
    if session.owner != owner {
        return Err(lorekeeper_core::error::Error::PermissionDenied.into());
    }
    Ok(Json(session))
}

pub async fn delete_history(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    let owner = caller.require()?;
    state.sessions.delete(&id, owner).await?;
    Ok(())
}
