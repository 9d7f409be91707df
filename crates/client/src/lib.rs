// Client crate clippy configuration
// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! taskboard client library
//!
//! Client-side half of the authentication lifecycle: a typed HTTP client
//! for the auth API, in-memory session custody with automatic logout at
//! token expiry, and the OTP-gated registration flow.
//!
//! Token claims are decoded here without signature verification, for
//! display only. The server re-verifies every protected call; nothing on
//! this side is a trust boundary.

pub mod api;
pub mod claims;
pub mod register;
pub mod session;

pub use api::{
    AuthApi, ClientError, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    UpdateUsernameResponse, UserSummary,
};
pub use claims::{decode_claims, ClaimsDecodeError, DecodedClaims};
pub use register::{FlowError, RegistrationFlow, RegistrationStage, MAX_OTP_ATTEMPTS};
pub use session::{SessionEvent, SessionManager, StoredUser};
