//! Session token issuance and validation
//!
//! Stateless HS256 signing: the issuer holds no persistent state, and a
//! token stays valid until its expiry claim regardless of server restarts.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// Username at issuance time; reissued on username change
    pub uname: String,
    pub email: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwtError {
    /// Signature mismatch or malformed token
    #[error("invalid token")]
    Invalid,
    /// Structurally valid and correctly signed, but past its expiry claim
    #[error("expired token")]
    Expired,
    #[error("failed to sign token")]
    Signing,
}

/// Issues and validates session tokens with a server-held secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a token for the given identity. Returns the signed token and
    /// its expiry timestamp.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        uname: &str,
        email: &str,
    ) -> Result<(String, OffsetDateTime), JwtError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + Duration::hours(self.expiry_hours);

        let claims = Claims {
            sub: user_id,
            uname: uname.to_string(),
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| JwtError::Signing)?;

        Ok((token, expires_at))
    }

    /// Validate signature and expiry, returning the decoded claims.
    ///
    /// Expiry is checked with zero leeway so a token issued with TTL T is
    /// rejected at T, not T plus a grace window.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(JwtError::Expired),
                _ => Err(JwtError::Invalid),
            },
        }
    }
}
