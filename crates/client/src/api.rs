//! Typed HTTP client for the taskboard auth API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error envelope
    #[error("{message} ({status})")]
    Api { status: u16, message: String },
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub uname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub uname: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub uname: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameResponse {
    pub message: String,
    pub new_username: Option<String>,
    /// Reissued token with the new username claim; absent on a no-op rename
    pub token: Option<String>,
}

/// Error envelope the server renders for every failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client bound to one API base URL (e.g. `http://localhost:5000`).
#[derive(Clone)]
pub struct AuthApi {
    base_url: String,
    client: reqwest::Client,
}

impl AuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ClientError> {
        self.execute(self.client.post(self.url("/api/auth/register")).json(request))
            .await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.execute(self.client.post(self.url("/api/auth/login")).json(request))
            .await
    }

    pub async fn send_otp(&self, email: &str) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .post(self.url("/api/auth/send-otp"))
                .json(&serde_json::json!({ "email": email })),
        )
        .await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .post(self.url("/api/auth/verify-otp"))
                .json(&serde_json::json!({ "email": email, "otp": otp })),
        )
        .await
    }

    pub async fn check_username_email(
        &self,
        uname: &str,
        email: &str,
    ) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .post(self.url("/api/auth/check-username-email"))
                .json(&serde_json::json!({ "uname": uname, "email": email })),
        )
        .await
    }

    pub async fn check_username(&self, uname: &str) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .post(self.url("/api/auth/check-username"))
                .json(&serde_json::json!({ "uname": uname })),
        )
        .await
    }

    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .put(self.url("/api/auth/change-password"))
                .bearer_auth(token)
                .json(&serde_json::json!({
                    "currentPassword": current_password,
                    "newPassword": new_password,
                })),
        )
        .await
    }

    pub async fn update_username(
        &self,
        token: &str,
        new_username: &str,
    ) -> Result<UpdateUsernameResponse, ClientError> {
        self.execute(
            self.client
                .put(self.url("/api/auth/update-username"))
                .bearer_auth(token)
                .json(&serde_json::json!({ "newUsername": new_username })),
        )
        .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .post(self.url("/api/password/forgot-password"))
                .json(&serde_json::json!({ "email": email })),
        )
        .await
    }

    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        self.execute(
            self.client
                .post(self.url(&format!("/api/password/reset-password/{reset_token}")))
                .json(&serde_json::json!({ "newPassword": new_password })),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        // Surface the server's message; fall back to the status line when
        // the body is not the expected envelope.
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = AuthApi::new("http://localhost:5000/");
        assert_eq!(api.url("/api/auth/login"), "http://localhost:5000/api/auth/login");
    }

    #[test]
    fn error_envelope_parses() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"Invalid username","code":400}"#).unwrap();
        assert_eq!(body.error, "Invalid username");
    }

    #[test]
    fn update_username_response_tolerates_missing_token() {
        let response: UpdateUsernameResponse =
            serde_json::from_str(r#"{"message":"Username is already set to this value"}"#).unwrap();
        assert!(response.token.is_none());
        assert!(response.new_username.is_none());
    }
}
