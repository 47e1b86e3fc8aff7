//! Error responses for route handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use agentgate_core::warehouse::WarehouseError;

/// Failures a handler reports to the browser, as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session cookie.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Cookie present but the session is gone or expired.
    #[error("Session expired")]
    SessionExpired,

    #[error("{0}")]
    BadRequest(String),

    /// The warehouse refused to open a session with the user's token.
    #[error(
        "Could not connect to Snowflake. Your session may have expired. Please logout and login again."
    )]
    WarehouseLogin,

    /// The warehouse rejected the token on a statement call.
    #[error("Token expired. Try refreshing: /api/token/refresh")]
    TokenExpired,

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::SessionExpired
            | Self::WarehouseLogin
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if let Self::Internal(_) = self {
            tracing::error!(error = %self, "Internal error");
            "Internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<WarehouseError> for ApiError {
    fn from(e: WarehouseError) -> Self {
        if e.is_auth_failure() {
            return Self::TokenExpired;
        }
        match e {
            WarehouseError::Config(msg) => Self::Internal(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}
