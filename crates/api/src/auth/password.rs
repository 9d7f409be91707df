//! Password hashing
//!
//! Argon2id with a per-hash random salt. Default parameters land around
//! 100ms per attempt on commodity hardware, which is the intended cost.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed")]
pub struct PasswordHashError;

/// Hash a plaintext password into a PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordHashError)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns false on mismatch or on an unparseable stored hash; never errors
/// so callers get a plain yes/no.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("Secret1!").expect("hashing should succeed");
        assert!(verify_password("Secret1!", &hash));
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("Secret1!").unwrap();
        assert!(!verify_password("Other1!", &hash));
    }

    #[test]
    fn plaintext_is_not_stored() {
        let hash = hash_password("Secret1!").unwrap();
        assert!(!hash.contains("Secret1!"));
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("Secret1!").unwrap();
        let b = hash_password("Secret1!").unwrap();
        assert_ne!(a, b);
        // Both still verify
        assert!(verify_password("Secret1!", &a));
        assert!(verify_password("Secret1!", &b));
    }

    #[test]
    fn garbage_stored_hash_fails_closed() {
        assert!(!verify_password("Secret1!", "not-a-phc-string"));
        assert!(!verify_password("Secret1!", ""));
    }
}
