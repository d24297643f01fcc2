use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{payment::PaymentError, repository::StoreError};

/// ApiError
///
/// The single failure type every gate and handler returns. Each variant maps to exactly
/// one HTTP status; the body is always `{ "message": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed `Authorization` header.
    #[error("Unauthorized: no bearer token provided")]
    Unauthenticated,

    /// The identity oracle rejected the token.
    #[error("Forbidden: invalid token")]
    InvalidCredential,

    /// A verified identity with no stored user profile.
    #[error("User is not registered")]
    PrincipalNotRegistered,

    #[error("Forbidden: insufficient role")]
    InsufficientRole,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    /// Store or payment provider failure. The detail is logged, never sent to the client.
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredential | ApiError::InsufficientRole => StatusCode::FORBIDDEN,
            ApiError::PrincipalNotRegistered | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Upstream(detail) => {
                tracing::error!(%detail, "upstream failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}
