//! Authentication module for the taskboard API

pub mod jwt;
pub mod middleware;
#[cfg(test)]
mod middleware_tests;
pub mod otp;
pub mod password;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{require_auth, AuthState, AuthUser};
pub use otp::{generate_otp, InMemoryOtpStore, OtpStore};
pub use password::{hash_password, verify_password};
