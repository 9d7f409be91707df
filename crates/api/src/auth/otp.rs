//! OTP ledger
//!
//! Transient one-time codes keyed by email with a fixed TTL. The store is an
//! injectable abstraction so a multi-instance deployment can swap the
//! process-local map for a distributed cache; with the in-memory
//! implementation, live codes do not survive a restart and do not replicate
//! across instances. That is a documented deployment constraint.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

/// Generate a 6-digit numeric code.
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Keyed one-time-code store.
///
/// At most one live entry per email; `set` overwrites (a resend supersedes
/// the previous code, last write wins). Entries are single-use by
/// convention, not enforcement: `verify` does not consume on success.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store a code for this email, stamping issuance and expiry.
    async fn set(&self, email: &str, code: &str);

    /// True iff a live entry exists for this email, its TTL has not
    /// elapsed, and the code matches exactly. Absent entries return false,
    /// never an error.
    async fn verify(&self, email: &str, code: &str) -> bool;

    /// Drop any entry for this email.
    async fn invalidate(&self, email: &str);

    /// Drop entries past their expiry. Returns how many were removed.
    async fn purge_expired(&self) -> usize;
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

/// Process-local OTP store backed by a shared map.
///
/// Last-write-wins under concurrency is acceptable here: the newest code is
/// the only one the user was mailed.
pub struct InMemoryOtpStore {
    entries: Arc<RwLock<HashMap<String, OtpEntry>>>,
    ttl: Duration,
}

impl InMemoryOtpStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    #[cfg(test)]
    fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

/// Constant-time code comparison once lengths match. Length itself is not
/// secret: every generated code is 6 digits.
fn codes_match(supplied: &str, stored: &str) -> bool {
    supplied.len() == stored.len()
        && supplied.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn set(&self, email: &str, code: &str) {
        let now = OffsetDateTime::now_utc();
        let entry = OtpEntry {
            code: code.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let mut entries = self.entries.write().await;
        if entries.insert(email.to_string(), entry).is_some() {
            tracing::debug!(email = %email, "Overwrote previous OTP entry");
        }
    }

    async fn verify(&self, email: &str, code: &str) -> bool {
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(email) else {
            return false;
        };

        if OffsetDateTime::now_utc() >= entry.expires_at {
            tracing::debug!(
                email = %email,
                issued_at = %entry.issued_at,
                "OTP expired"
            );
            return false;
        }

        codes_match(code, &entry.code)
    }

    async fn invalidate(&self, email: &str) {
        self.entries.write().await.remove(email);
    }

    async fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn verify_succeeds_with_stored_code() {
        let store = InMemoryOtpStore::new(5);
        store.set("a@x.com", "123456").await;
        assert!(store.verify("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn verify_fails_on_wrong_code() {
        let store = InMemoryOtpStore::new(5);
        store.set("a@x.com", "123456").await;
        assert!(!store.verify("a@x.com", "000000").await);
    }

    #[tokio::test]
    async fn verify_fails_on_absent_entry_without_panicking() {
        let store = InMemoryOtpStore::new(5);
        assert!(!store.verify("nobody@x.com", "123456").await);
    }

    #[tokio::test]
    async fn verify_fails_after_ttl_elapses() {
        let store = InMemoryOtpStore::with_ttl(Duration::seconds(-1));
        store.set("a@x.com", "123456").await;
        assert!(!store.verify("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn resend_overwrites_previous_code() {
        let store = InMemoryOtpStore::new(5);
        store.set("a@x.com", "111111").await;
        store.set("a@x.com", "222222").await;

        assert!(!store.verify("a@x.com", "111111").await);
        assert!(store.verify("a@x.com", "222222").await);
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let store = InMemoryOtpStore::new(5);
        store.set("a@x.com", "123456").await;
        store.invalidate("a@x.com").await;
        assert!(!store.verify("a@x.com", "123456").await);
    }

    #[tokio::test]
    async fn entries_are_independent_per_email() {
        let store = InMemoryOtpStore::new(5);
        store.set("a@x.com", "111111").await;
        store.set("b@y.com", "222222").await;

        assert!(store.verify("a@x.com", "111111").await);
        assert!(store.verify("b@y.com", "222222").await);
        assert!(!store.verify("a@x.com", "222222").await);
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let store = InMemoryOtpStore::with_ttl(Duration::seconds(-1));
        store.set("stale@x.com", "111111").await;

        let live = InMemoryOtpStore::new(5);
        live.set("live@x.com", "222222").await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(live.purge_expired().await, 0);
        assert!(live.verify("live@x.com", "222222").await);
    }

    #[test]
    fn code_comparison_requires_equal_length() {
        assert!(!codes_match("12345", "123456"));
        assert!(codes_match("123456", "123456"));
    }
}
