//! Password reset routes
//!
//! The reset token travels to the user by email and only its SHA-256 digest
//! is stored, so a leaked database snapshot cannot be replayed against the
//! reset endpoint. The token is consumed (cleared) in the same UPDATE that
//! writes the new password.

use axum::{
    extract::{Path, State},
    Json,
};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::Duration;

use crate::{
    error::{ApiError, ApiResult},
    routes::auth::{MessageResponse, MIN_PASSWORD_LEN},
    state::AppState,
    users,
};

const RESET_TOKEN_BYTES: usize = 32;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

// =============================================================================
// Token helpers
// =============================================================================

/// Random opaque token, hex-encoded. The raw value goes into the email; only
/// its digest is persisted.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// =============================================================================
// Handlers
// =============================================================================

/// Request a password reset email
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if payload.email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }

    let user = users::find_by_email(&state.pool, &payload.email)
        .await?
        .ok_or(ApiError::NotFound)?;

    let token = generate_reset_token();
    let expires_at = time::OffsetDateTime::now_utc()
        + Duration::minutes(state.config.reset_token_ttl_minutes);

    users::set_reset_token(&state.pool, user.id, &hash_reset_token(&token), expires_at).await?;

    if let Err(e) = state.email.send_reset_email(&user.email, &token).await {
        tracing::error!(user_id = %user.id, error = %e, "Reset email dispatch failed");
        return Err(ApiError::Dependency(
            "Failed to send password reset email".to_string(),
        ));
    }

    tracing::info!(user_id = %user.id, expires_at = %expires_at, "Password reset requested");

    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// Complete a password reset with the emailed token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Some(new_password) = payload.new_password else {
        return Err(ApiError::Validation("New password is required".to_string()));
    };

    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "New password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    let Some(user) =
        users::find_by_live_reset_token(&state.pool, &hash_reset_token(&token)).await?
    else {
        return Err(ApiError::Validation(
            "Invalid or expired reset token".to_string(),
        ));
    };

    let new_hash =
        crate::auth::hash_password(&new_password).map_err(|_| ApiError::Internal)?;
    users::consume_reset_token(&state.pool, user.id, &new_hash).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(Json(MessageResponse::new("Password has been reset")))
}
