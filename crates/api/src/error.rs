//! API error types
//!
//! Every failure surfaces as a JSON body `{"error": <message>, "code": <status>}`
//! with a human-readable message. Database details are logged, never exposed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input (400)
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation reported before any mutation (400)
    #[error("{0}")]
    Conflict(String),

    /// Uniqueness violation on a read-only probe or rename (409)
    #[error("{0}")]
    ConflictExisting(String),

    /// Failed credential check (400 per the observed surface)
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Not found")]
    NotFound,

    /// Bad, missing, or expired session token (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Notification dispatch or other collaborator failure (500)
    #[error("{0}")]
    Dependency(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::ConflictExisting(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::InvalidCredentials(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            ),
            ApiError::Dependency(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::Database(e) => {
                tracing::error!(error = ?e, "Database query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            status_of(ApiError::Validation("Username is required".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflict_variants_map_to_400_and_409() {
        assert_eq!(
            status_of(ApiError::Conflict("Username or Email already exists".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::ConflictExisting("Username already exists".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn unauthorized_is_generic_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let response = ApiError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
