//! `/users*` handlers (§6, ambient A3).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use lorekeeper_core::model::PublicUser;

use crate::auth_extractor::AuthenticatedCaller;
use crate::error_response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.auth.register(&req.username, &req.email, &req.password)?;
    Ok(Json(PublicUser::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.auth.verify_password(&req.username, &req.password)?;
    let token = state.auth.issue_token(&user.id)?;
    Ok(Json(LoginResponse {
        token: token.token,
        expires_at: token.expires_at,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<PublicUser>, ApiError> {
    let user_id = caller.require()?;
    let user = state
        .auth
        .get_by_id(user_id)?
        .ok_or_else(|| lorekeeper_core::error::Error::not_found("user"))?;
    Ok(Json(PublicUser::from(&user)))
}
