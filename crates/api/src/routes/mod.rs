//! Route assembly

pub mod auth;
pub mod password_reset;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::{auth::require_auth, state::AppState};

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Username/password mutations require a verified session token
    let protected_routes = Router::new()
        .route("/change-password", put(auth::change_password))
        .route("/update-username", put(auth::update_username))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/send-otp", post(auth::send_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/check-username-email", post(auth::check_username_email))
        .route("/check-username", post(auth::check_username))
        .merge(protected_routes);

    let password_routes = Router::new()
        .route("/forgot-password", post(password_reset::forgot_password))
        .route(
            "/reset-password/{token}",
            post(password_reset::reset_password),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/password", password_routes)
        .with_state(state)
}
