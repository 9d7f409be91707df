// API crate clippy configuration
// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! taskboard API library
//!
//! Authentication and session-lifecycle backend for the taskboard
//! application: OTP-gated registration, login with stateless session
//! tokens, uniqueness probes, and password reset.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod routes;
pub mod state;
pub mod users;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
