use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use hermes_crypto::TokenError;
use hermes_db::DbError;
use hermes_types::api::{ErrorResponse, FieldError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("user input failed validation")]
    BadInput(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    /// Covers both "does not exist" and "exists but not yours", so callers
    /// cannot probe for other users' message ids.
    #[error("message does not exist or is not accessible with this token")]
    NotFound,
    #[error("user already exists")]
    Conflict,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadInput(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadInput(fields) => ErrorResponse {
                error: "user input failed validation".to_string(),
                fields,
            },
            Self::Internal(err) => {
                // Detail stays in the log; the caller gets the generic message
                error!("Internal error: {:#}", err);
                ErrorResponse {
                    error: "internal server error".to_string(),
                    fields: Vec::new(),
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                fields: Vec::new(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UsernameTaken => Self::Conflict,
            DbError::UnknownRecipient(id) => Self::BadRequest(format!("not valid recipient: {}", id)),
            // Token was signed for a user that no longer exists
            DbError::UnknownOwner => Self::Unauthorized("token subject does not exist".to_string()),
            other => Self::Internal(anyhow::Error::new(other).context("database failure")),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
