//! Server configuration loaded from the environment

use anyhow::Context;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string (required)
    pub database_url: String,
    /// HMAC secret for session token signing (required)
    pub jwt_secret: String,
    /// Session token TTL in hours (default 1)
    pub jwt_expiry_hours: i64,
    /// OTP TTL in minutes (default 5)
    pub otp_ttl_minutes: i64,
    /// Password reset token TTL in minutes (default 60)
    pub reset_token_ttl_minutes: i64,
    /// Socket address the server binds to
    pub bind_address: String,
    /// Comma-separated CORS origin allowlist
    pub allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiry_hours: env_i64("JWT_EXPIRY_HOURS", 1)?,
            otp_ttl_minutes: env_i64("OTP_TTL_MINUTES", 5)?,
            reset_token_ttl_minutes: env_i64("RESET_TOKEN_TTL_MINUTES", 60)?,
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:4200,http://127.0.0.1:4200".to_string()),
        })
    }
}

fn env_i64(name: &str, default: i64) -> anyhow::Result<i64> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<i64>()
            .with_context(|| format!("{} must be an integer, got {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
