use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, ApiError>;

/// ApiError
///
/// Every failure a handler can report. Ownership failures surface as `Validation`,
/// indistinguishable from a reference to nothing.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input or a reference the caller does not own (400).
    #[error("{0}")]
    Validation(String),

    /// Registration payload failed a field rule (422).
    #[error("{message}")]
    Unprocessable { message: String, location: String },

    /// A unique key is already taken (400).
    #[error("{0}")]
    Conflict(String),

    /// The primary entity is absent or owned by someone else (404).
    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Storage(#[from] RepositoryError),

    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unprocessable(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::Unprocessable {
            message: message.into(),
            location: location.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(RepositoryError::Conflict) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// ErrorBody
///
/// Body of every 400 and 500 response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

/// ValidationErrorBody
///
/// Body of a 422 registration failure, naming the offending field in `location`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrorBody {
    pub code: u16,
    pub reason: String,
    pub message: String,
    pub location: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(message) | ApiError::Conflict(message) => {
                (status, Json(ErrorBody { message })).into_response()
            }
            ApiError::Storage(RepositoryError::Conflict) => (
                status,
                Json(ErrorBody {
                    message: "The resource already exists".to_string(),
                }),
            )
                .into_response(),
            ApiError::Unprocessable { message, location } => (
                status,
                Json(ValidationErrorBody {
                    code: status.as_u16(),
                    reason: "ValidationError".to_string(),
                    message,
                    location,
                }),
            )
                .into_response(),
            ApiError::NotFound | ApiError::Unauthorized => status.into_response(),
            ApiError::Storage(e) => {
                // Logged here, never echoed to the client.
                tracing::error!("storage error: {:?}", e);
                internal_error(status)
            }
            ApiError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                internal_error(status)
            }
        }
    }
}

fn internal_error(status: StatusCode) -> Response {
    (
        status,
        Json(ErrorBody {
            message: "Internal Server Error".to_string(),
        }),
    )
        .into_response()
}
