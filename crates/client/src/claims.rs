//! Unverified session token decoding
//!
//! Decodes the payload segment of a session token for display purposes
//! only. No signature check happens here and none ever should: every
//! authorization decision re-verifies the token server-side. A client that
//! forges claims only lies to itself.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("token payload could not be decoded")]
pub struct ClaimsDecodeError;

/// Claims read from a token without signature verification.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodedClaims {
    pub sub: Uuid,
    pub uname: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl DecodedClaims {
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at() <= OffsetDateTime::now_utc()
    }
}

/// Decode the middle (payload) segment of a token.
pub fn decode_claims(token: &str) -> Result<DecodedClaims, ClaimsDecodeError> {
    let payload = token.split('.').nth(1).ok_or(ClaimsDecodeError)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ClaimsDecodeError)?;
    serde_json::from_slice(&bytes).map_err(|_| ClaimsDecodeError)
}

#[cfg(test)]
pub(crate) fn make_unsigned_token(sub: Uuid, uname: &str, email: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "sub": sub,
            "uname": uname,
            "email": email,
            "iat": exp - 3600,
            "exp": exp,
        })
        .to_string(),
    );
    format!("{header}.{payload}.unsigned")
}
