//! Authentication routes
//!
//! Registration (OTP-gated by the client), login, uniqueness probes, and
//! the authenticated username/password mutations. Conflict and validation
//! failures are detected before any write; the storage layer's UNIQUE
//! constraints close the remaining check-then-write race.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{generate_otp, hash_password, verify_password, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
    users::{self, UserProjection},
};

/// Minimum accepted password length, applied on change and reset.
pub(crate) const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub uname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub uname: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserProjection,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUnameEmailRequest {
    pub uname: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUnameRequest {
    pub uname: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameRequest {
    pub new_username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_username: Option<String>,
    /// Reissued token carrying the new username claim; absent on no-op
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new user
///
/// The conflict answer is deliberately undifferentiated here; clients probe
/// `/check-username-email` beforehand for field-level detail. The welcome
/// email is dispatched after the row commits and never affects the response:
/// failing the registration for a missed greeting would only send the
/// client's retry into the conflict path.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    if payload.uname.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Username, email and password are required".to_string(),
        ));
    }

    if users::uname_or_email_exists(&state.pool, &payload.uname, &payload.email).await? {
        return Err(ApiError::Conflict(
            "Username or Email already exists".to_string(),
        ));
    }

    let password_hash =
        hash_password(&payload.password).map_err(|_| ApiError::Internal)?;

    let user = match users::insert_user(&state.pool, &payload.uname, &payload.email, &password_hash)
        .await
    {
        Ok(user) => user,
        // Concurrent registration won the race; report it as the same conflict
        Err(e) if users::is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "Username or Email already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, uname = %user.uname, "User registered");

    // Fire-and-forget: the account exists whether or not the greeting lands
    let email_service = state.email.clone();
    let (to, uname) = (user.email.clone(), user.uname.clone());
    tokio::spawn(async move {
        if let Err(e) = email_service.send_welcome_email(&to, &uname).await {
            tracing::error!(error = %e, "Failed to send welcome email");
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// Log in with username and password
///
/// The two distinct failure messages mirror the historical surface; they are
/// a known, accepted enumeration risk.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let Some(user) = users::find_by_uname(&state.pool, &payload.uname).await? else {
        return Err(ApiError::InvalidCredentials("Invalid username".to_string()));
    };

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::warn!(uname = %payload.uname, "Login failed: password mismatch");
        return Err(ApiError::InvalidCredentials("Invalid password".to_string()));
    }

    let (token, expires_at) = state
        .jwt_manager
        .issue_token(user.id, &user.uname, &user.email)
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(user_id = %user.id, expires_at = %expires_at, "Login successful");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProjection::from(&user),
    }))
}

/// Generate and dispatch a one-time code
///
/// No uniqueness check happens here; clients probe `/check-username-email`
/// first by convention. The code is stored before the dispatch attempt, and
/// dispatch failure surfaces as a 500 distinct from any validation failure.
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if payload.email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }

    let otp = generate_otp();
    state.otp_store.set(&payload.email, &otp).await;

    if let Err(e) = state.email.send_otp_email(&payload.email, &otp).await {
        tracing::error!(email = %payload.email, error = %e, "OTP dispatch failed");
        return Err(ApiError::Dependency("Failed to send OTP".to_string()));
    }

    Ok(Json(MessageResponse::new("OTP sent to email")))
}

/// Verify a one-time code
///
/// Pure gate: verification does not mutate registration state. The ledger
/// answers false for absent, mismatched, and expired entries alike.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if state.otp_store.verify(&payload.email, &payload.otp).await {
        Ok(Json(MessageResponse::new("OTP verified")))
    } else {
        Err(ApiError::Validation("Invalid or expired OTP".to_string()))
    }
}

/// Probe username and email availability with differentiated conflicts
///
/// Username comparison is case-insensitive, email comparison exact. The two
/// probes are independent, so "both exist" is reported even when the
/// username and email belong to different users.
pub async fn check_username_email(
    State(state): State<AppState>,
    Json(payload): Json<CheckUnameEmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let username_exists = users::uname_exists(&state.pool, &payload.uname).await?;
    let email_exists = users::email_exists(&state.pool, &payload.email).await?;

    match (username_exists, email_exists) {
        (true, true) => Err(ApiError::ConflictExisting(
            "Username and Email already exist".to_string(),
        )),
        (true, false) => Err(ApiError::ConflictExisting(
            "Username already exists".to_string(),
        )),
        (false, true) => Err(ApiError::ConflictExisting(
            "Email already exists".to_string(),
        )),
        (false, false) => Ok(Json(MessageResponse::new("Username and Email are available"))),
    }
}

/// Probe username availability (case-insensitive)
pub async fn check_username(
    State(state): State<AppState>,
    Json(payload): Json<CheckUnameRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let trimmed = payload.uname.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("Username is required".to_string()));
    }

    if users::uname_exists(&state.pool, trimmed).await? {
        return Err(ApiError::ConflictExisting(
            "Username already exists".to_string(),
        ));
    }

    Ok(Json(MessageResponse::new("Username is available")))
}

/// Change the authenticated user's password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(current_password), Some(new_password)) =
        (payload.current_password, payload.new_password)
    else {
        return Err(ApiError::Validation(
            "Current password and new password are required".to_string(),
        ));
    };

    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "New password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    let user = users::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !verify_password(&current_password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials(
            "Current password is incorrect".to_string(),
        ));
    }

    // Both passwords arrive as plaintext; sameness is decided by matching
    // the new one against the stored hash, not by string comparison.
    if verify_password(&new_password, &user.password_hash) {
        return Err(ApiError::Validation(
            "New password must be different from current password".to_string(),
        ));
    }

    let new_hash = hash_password(&new_password).map_err(|_| ApiError::Internal)?;
    users::update_password(&state.pool, user.id, &new_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Rename the authenticated user
///
/// A successful rename reissues the session token with the new username
/// claim; without that the client's cached identity goes stale until the
/// old token expires. An unchanged name (case-sensitive exact match) is a
/// no-op success with no new token.
pub async fn update_username(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateUsernameRequest>,
) -> ApiResult<Json<UpdateUsernameResponse>> {
    let Some(new_username) = payload.new_username else {
        return Err(ApiError::Validation("New username is required".to_string()));
    };

    let trimmed = new_username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("Username cannot be empty".to_string()));
    }

    let user = users::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if user.uname == trimmed {
        return Ok(Json(UpdateUsernameResponse {
            message: "Username is already set to this value".to_string(),
            new_username: None,
            token: None,
        }));
    }

    if users::uname_taken_by_other(&state.pool, trimmed, user.id).await? {
        return Err(ApiError::ConflictExisting(
            "Username already exists".to_string(),
        ));
    }

    match users::update_uname(&state.pool, user.id, trimmed).await {
        Ok(()) => {}
        Err(e) if users::is_unique_violation(&e) => {
            return Err(ApiError::ConflictExisting(
                "Username already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let (token, _) = state
        .jwt_manager
        .issue_token(user.id, trimmed, &user.email)
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(user_id = %user.id, new_username = %trimmed, "Username updated");

    Ok(Json(UpdateUsernameResponse {
        message: "Username updated successfully".to_string(),
        new_username: Some(trimmed.to_string()),
        token: Some(token),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_username_response_omits_token_on_noop() {
        let response = UpdateUsernameResponse {
            message: "Username is already set to this value".to_string(),
            new_username: None,
            token: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("token").is_none());
        assert!(json.get("newUsername").is_none());
    }

    #[test]
    fn request_dtos_use_the_wire_field_names() {
        let change: ChangePasswordRequest = serde_json::from_str(
            r#"{"currentPassword":"Secret1!","newPassword":"Other1!"}"#,
        )
        .unwrap();
        assert_eq!(change.current_password.as_deref(), Some("Secret1!"));
        assert_eq!(change.new_password.as_deref(), Some("Other1!"));

        let rename: UpdateUsernameRequest =
            serde_json::from_str(r#"{"newUsername":"alicia"}"#).unwrap();
        assert_eq!(rename.new_username.as_deref(), Some("alicia"));
    }

    #[test]
    fn missing_password_fields_deserialize_to_none() {
        let change: ChangePasswordRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(change.current_password.is_none());
        assert!(change.new_password.is_none());
    }
}
