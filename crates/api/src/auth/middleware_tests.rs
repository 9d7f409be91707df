//! Unit tests for authentication middleware
//!
//! Tests cover:
//! - Bearer token extraction (missing header, wrong scheme)
//! - Valid token passing claims through to the handler
//! - Expired and tampered tokens producing the same generic 401

#[cfg(test)]
mod tests {
    use super::super::jwt::JwtManager;
    use super::super::middleware::{require_auth, AuthState, AuthUser};
    use axum::{
        body::Body,
        extract::Extension,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-jwt-secret-key-for-testing-only";

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        user.uname
    }

    fn protected_app(jwt_manager: JwtManager) -> Router {
        let auth_state = AuthState { jwt_manager };
        Router::new()
            .route("/me", get(whoami))
            .layer(middleware::from_fn_with_state(auth_state, require_auth))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_401() {
        let app = protected_app(JwtManager::new(SECRET, 1));

        let response = app
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("missing or invalid"));
    }

    #[tokio::test]
    async fn wrong_scheme_is_401() {
        let app = protected_app(JwtManager::new(SECRET, 1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header("Authorization", "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_claims() {
        let jwt_manager = JwtManager::new(SECRET, 1);
        let (token, _) = jwt_manager
            .issue_token(Uuid::new_v4(), "alice", "a@x.com")
            .unwrap();
        let app = protected_app(jwt_manager);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "alice");
    }

    #[tokio::test]
    async fn expired_and_tampered_tokens_get_the_same_message() {
        // Issued already expired
        let expired_issuer = JwtManager::new(SECRET, -1);
        let (expired_token, _) = expired_issuer
            .issue_token(Uuid::new_v4(), "alice", "a@x.com")
            .unwrap();

        let app = protected_app(JwtManager::new(SECRET, 1));
        let expired_response = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header("Authorization", format!("Bearer {}", expired_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let app = protected_app(JwtManager::new(SECRET, 1));
        let tampered_response = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header("Authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(expired_response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(tampered_response.status(), StatusCode::UNAUTHORIZED);

        // No oracle: the caller cannot tell expired from malformed.
        let expired_body = body_string(expired_response).await;
        let tampered_body = body_string(tampered_response).await;
        assert_eq!(expired_body, tampered_body);
        assert!(expired_body.contains("Invalid or expired token"));
    }

    #[tokio::test]
    async fn token_for_one_app_does_not_open_another() {
        let other_issuer = JwtManager::new("a-different-secret", 1);
        let (token, _) = other_issuer
            .issue_token(Uuid::new_v4(), "alice", "a@x.com")
            .unwrap();

        let app = protected_app(JwtManager::new(SECRET, 1));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
