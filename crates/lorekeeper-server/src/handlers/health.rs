//! `/healthz` and `/metrics` (ambient A4).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.export() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
