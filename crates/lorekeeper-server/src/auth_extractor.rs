//! Bearer-token extraction for HTTP handlers: `Authorization: Bearer
//! <token>` resolved against the [`lorekeeper_sessions::AuthStore`].

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;

use lorekeeper_core::model::Caller;

use crate::state::AppState;

/// The authenticated caller. Extraction fails the request with 401 if no
/// valid bearer token is present.
pub struct AuthenticatedCaller(pub Caller);

/// The caller identity if present, `None` for an unauthenticated request.
/// Used by endpoints where auth is optional (`GET /articles/{id}`).
pub struct OptionalCaller(pub Caller);

/// Bearer token from the `Authorization` header, or — since a browser
/// WebSocket upgrade cannot set custom headers — from a `token` query
/// parameter on the upgrade URL (§6).
fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(token) = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }
    parts.uri.query().and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .map(str::to_string)
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = bearer_token(parts).ok_or((StatusCode::UNAUTHORIZED, "missing bearer token"))?;
        let user_id = app_state
            .auth
            .authenticate(&token)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid or expired token"))?;
        Ok(AuthenticatedCaller(Caller::user(user_id)))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let caller = match bearer_token(parts) {
            Some(token) => match app_state.auth.authenticate(&token) {
                Ok(user_id) => Caller::user(user_id),
                Err(_) => Caller::anonymous(),
            },
            None => Caller::anonymous(),
        };
        Ok(OptionalCaller(caller))
    }
}
