use thiserror::Error;

/// The closed error type shared by every lorekeeper crate.
///
/// Every variant maps to exactly one of the error kinds enumerated in the
/// error handling design: each carries enough context for server-side
/// logging while [`Error::category`] gives the short, upstream-detail-free
/// string that is safe to hand back to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("permission denied")]
    PermissionDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("cancelled")]
    Cancelled,

    #[error("client too slow to accept frames")]
    ClientSlow,

    #[error("retrieval unavailable: both lexical and vector search failed")]
    RetrievalUnavailable,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short, human-readable, upstream-detail-free category string.
    ///
    /// This is what ends up in an `error` event-bus frame and in HTTP
    /// error bodies; the full [`Error`] (with its `{0}` detail) is only
    /// ever written to the server-side trace.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Error::ValidationFailed(_) => "ValidationFailed",
            Error::Unauthorized => "Unauthorized",
            Error::PermissionDenied => "PermissionDenied",
            Error::NotFound(_) => "NotFound",
            Error::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Error::MalformedResponse(_) => "MalformedResponse",
            Error::Cancelled => "Cancelled",
            Error::ClientSlow => "ClientSlow",
            Error::RetrievalUnavailable => "RetrievalUnavailable",
            Error::Conflict(_) => "Conflict",
            Error::Internal(_) => "Internal",
        }
    }

    /// Whether this error is safe to retry for an idempotent read per the
    /// propagation policy (transient upstream failures only).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::ValidationFailed(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::UpstreamUnavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedResponse(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Internal(format!("sqlite: {e}"))
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::Internal(format!("sqlite pool: {e}"))
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
