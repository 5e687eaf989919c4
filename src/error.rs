use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::response::Envelope;

/// RepoError
///
/// Failures raised by a `Repository` implementation. Handlers never inspect
/// driver errors directly; they convert these into `ApiError` by kind.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A referenced record (e.g. a product's category) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),
    /// A schema constraint (min, required, check) was violated on write.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// ApiError
///
/// The single error taxonomy of the HTTP surface. Every variant renders as the
/// standard envelope `{ "success": false, "message": ... }` with the status
/// code matching its kind.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(entity) => ApiError::not_found(entity),
            RepoError::Conflict(msg) => ApiError::Conflict(msg),
            RepoError::Validation(msg) => ApiError::Validation(msg),
            RepoError::Database(_) => ApiError::Internal("Internal server error".to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "{}", self);
        }
        (status, Json(Envelope::<()>::failure(self.to_string()))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
