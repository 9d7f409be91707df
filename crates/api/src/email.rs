//! Outbound email dispatch
//!
//! Thin client for a Resend-style HTTP email API. When no API key is
//! configured the service is disabled: sends are logged and reported as
//! success so local development works without a provider account.

use std::time::Duration;

use serde_json::json;

const SEND_ENDPOINT: &str = "https://api.resend.com/emails";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
#[error("email dispatch failed: {0}")]
pub struct EmailError(String);

#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_address: String,
    frontend_url: String,
    client: reqwest::Client,
}

impl EmailService {
    pub fn from_env() -> Self {
        let api_key = std::env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty());
        let from_address = std::env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "taskboard <noreply@taskboard.dev>".to_string());
        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:4200".to_string());

        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            from_address,
            frontend_url,
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send_welcome_email(&self, to: &str, uname: &str) -> Result<(), EmailError> {
        self.send(
            to,
            "Welcome to taskboard",
            &format!(
                "<p>Hi {uname},</p><p>Your account has been created. \
                 Log in to start organizing your projects.</p>"
            ),
        )
        .await
    }

    pub async fn send_otp_email(&self, to: &str, code: &str) -> Result<(), EmailError> {
        self.send(
            to,
            "Your taskboard verification code",
            &format!("<p>Your verification code is <strong>{code}</strong>. It expires shortly.</p>"),
        )
        .await
    }

    pub async fn send_reset_email(&self, to: &str, token: &str) -> Result<(), EmailError> {
        let link = format!("{}/reset-password/{}", self.frontend_url, token);
        self.send(
            to,
            "Reset your taskboard password",
            &format!(
                "<p>A password reset was requested for this address.</p>\
                 <p><a href=\"{link}\">Reset your password</a></p>\
                 <p>If you did not request this, you can ignore this email.</p>"
            ),
        )
        .await
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!(to = %to, subject = %subject, "Email service disabled, skipping send");
            return Ok(());
        };

        let payload = json!({
            "from": self.from_address,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(SEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(to = %to, status = %status, "Email provider rejected the send");
            return Err(EmailError(format!("provider returned {}", status)));
        }

        tracing::info!(to = %to, subject = %subject, "Email dispatched");
        Ok(())
    }
}
