use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::keystore::KeyStoreError;

pub const REDACTED_MESSAGE: &str = "Internal server error";
pub const AUTH_UNAVAILABLE_MESSAGE: &str = "Authorization subsystem unavailable";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("authorization backend unavailable: {0}")]
    AuthUnavailable(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AuthUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Db(_) | AppError::Store(_) | AppError::KeyStore(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the response body. Backend failure detail is only surfaced
    /// outside production.
    pub fn public_message(&self, redact: bool) -> String {
        match self {
            AppError::AuthUnavailable(_) => AUTH_UNAVAILABLE_MESSAGE.to_string(),
            AppError::Db(_) | AppError::Store(_) | AppError::KeyStore(_) | AppError::Internal(_)
                if redact =>
            {
                REDACTED_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let body = json!({ "error": self.public_message(*crate::config::IS_PRODUCTION) });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
