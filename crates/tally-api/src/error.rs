use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tally_auth::{AccessError, AuthError};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Caller-facing failure. The only place domain errors become HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("missing bearer token")]
    MissingToken,

    /// Request body, query or path could not be decoded.
    #[error("{1}")]
    Malformed(StatusCode, String),

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(AuthError::DuplicateIdentity(field)) => {
                debug!("Registration rejected: duplicate {}", field);
                (StatusCode::CONFLICT, format!("{} is already registered", field))
            }
            ApiError::Auth(AuthError::AuthFailure) => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            ApiError::Auth(AuthError::InvalidToken) => {
                (StatusCode::UNAUTHORIZED, "Invalid session".to_string())
            }
            ApiError::Auth(AuthError::Validation(msg))
            | ApiError::Access(AccessError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Auth(AuthError::Internal(msg)) => {
                error!("Auth internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::Auth(AuthError::Store(e)) | ApiError::Access(AccessError::Store(e)) => {
                error!("Storage error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Access(AccessError::Unauthenticated(rejection)) => {
                warn!("Unauthenticated request: {}", rejection);
                (StatusCode::UNAUTHORIZED, capitalize(&rejection.to_string()))
            }
            ApiError::Access(AccessError::NotFound) => {
                (StatusCode::NOT_FOUND, "Expense not found".to_string())
            }
            ApiError::Malformed(status, msg) => {
                debug!("Malformed request: {}", msg);
                (status, msg)
            }
            ApiError::MissingToken => {
                (StatusCode::UNAUTHORIZED, "Missing bearer token".to_string())
            }
            ApiError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed(rejection.status(), rejection.body_text())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
