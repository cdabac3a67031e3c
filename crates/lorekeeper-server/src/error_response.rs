//! Maps the closed [`lorekeeper_core::error::Error`] onto an HTTP status
//! code and a small JSON error body (§7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use lorekeeper_core::error::Error;

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::UpstreamUnavailable(_) | Error::RetrievalUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            Error::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Error::ClientSlow => StatusCode::REQUEST_TIMEOUT,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.category() }));
        tracing::warn!(error = %self.0, category = self.0.category(), "request failed");
        (status, body).into_response()
    }
}
