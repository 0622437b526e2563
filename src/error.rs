use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to API clients. Each maps to one HTTP status; the body is
/// always `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0}")]
    Validation(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    Unauthorized,

    #[error("account is inactive")]
    InactiveAccount,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::DuplicateEmail | Self::WeakPassword(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InactiveAccount => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
