//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::jwt::JwtManager;

/// Authenticated user information extracted from a verified session token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub uname: String,
    pub email: String,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(String::from)
}

/// Middleware that requires a valid session token
///
/// The token signature and expiry are re-verified here on every protected
/// call; whatever the client decoded locally is never trusted. Expired and
/// malformed tokens get the same generic 401 so the response cannot be used
/// as a signature oracle.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(token) = extract_bearer_token(&request) else {
        tracing::warn!(path = %path, "require_auth: missing or malformed Authorization header");
        return AuthError::MissingAuth.into_response();
    };

    match auth_state.jwt_manager.validate_token(&token) {
        Ok(claims) => {
            tracing::debug!(path = %path, user_id = %claims.sub, "require_auth: authenticated");
            request.extensions_mut().insert(AuthUser {
                user_id: claims.sub,
                uname: claims.uname,
                email: claims.email,
            });
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "require_auth: token rejected");
            AuthError::InvalidToken.into_response()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization token missing or invalid")]
    MissingAuth,
    #[error("Invalid or expired token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingAuth => "Authorization token missing or invalid",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        let body = Json(json!({
            "error": message,
            "code": StatusCode::UNAUTHORIZED.as_u16()
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
