//! Application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{AuthState, InMemoryOtpStore, JwtManager, OtpStore},
    config::Config,
    email::EmailService,
};

/// How often the background sweep drops expired OTP entries
const OTP_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub email: EmailService,
    /// Transient OTP ledger; process-local by default, injectable so a
    /// multi-instance deployment can swap in a shared cache
    pub otp_store: Arc<dyn OtpStore>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);

        let email = EmailService::from_env();
        if email.is_enabled() {
            tracing::info!("Email notifications enabled");
        } else {
            tracing::warn!("Email notifications not configured (missing RESEND_API_KEY)");
        }

        let otp_store: Arc<dyn OtpStore> =
            Arc::new(InMemoryOtpStore::new(config.otp_ttl_minutes));
        tracing::info!(
            ttl_minutes = config.otp_ttl_minutes,
            "In-memory OTP store initialized (entries do not survive restart)"
        );

        // Sweep expired OTP entries so the map stays bounded
        let store_for_sweep = otp_store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(OTP_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let purged = store_for_sweep.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged = purged, "Purged expired OTP entries");
                }
            }
        });

        Self {
            pool,
            config,
            jwt_manager,
            email,
            otp_store,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
