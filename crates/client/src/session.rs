//! Client-side session custody
//!
//! Holds the issued token and a minimal user projection in memory (the
//! tab-scoped storage analog), schedules a one-shot watcher that clears the
//! session exactly at the token's expiry claim, and publishes sign-in/out
//! transitions on a watch channel for the embedding UI to react to (the
//! redirect-to-login analog).
//!
//! Claims are read with an unverified decode: informational only. The
//! server re-verifies signature and expiry on every protected call.

use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::claims::decode_claims;

/// Minimal user projection kept alongside the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: Uuid,
    pub uname: String,
    pub email: String,
}

/// Session transitions observable by the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// No live session. `expired` distinguishes an expiry-triggered logout
    /// (show "session expired, please log in again") from an explicit one.
    SignedOut { expired: bool },
    SignedIn,
}

struct Inner {
    token: Option<String>,
    user: Option<StoredUser>,
    watcher: Option<JoinHandle<()>>,
    /// Bumped on every (re)schedule and logout; a watcher that outlives its
    /// generation is stale and must not clear a fresher session.
    generation: u64,
}

/// Client-side custodian of one session.
///
/// Cheap to clone; clones share the same session state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Mutex<Inner>>,
    events: Arc<watch::Sender<SessionEvent>>,
}

fn lock(inner: &Arc<Mutex<Inner>>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionManager {
    pub fn new() -> Self {
        let (events, _) = watch::channel(SessionEvent::SignedOut { expired: false });
        Self {
            inner: Arc::new(Mutex::new(Inner {
                token: None,
                user: None,
                watcher: None,
                generation: 0,
            })),
            events: Arc::new(events),
        }
    }

    /// Construct from a token that survived from a previous page load.
    ///
    /// A live token resumes the session and arms the expiry watcher; an
    /// already-expired one is discarded with the expired indicator set; an
    /// undecodable one is ignored.
    pub fn resume(token: String) -> Self {
        let manager = Self::new();

        match decode_claims(&token) {
            Ok(claims) if !claims.is_expired() => {
                let user = StoredUser {
                    id: claims.sub,
                    uname: claims.uname,
                    email: claims.email,
                };
                manager.handle_login(token, user);
            }
            Ok(_) => {
                tracing::info!("Stored token already expired, not resuming session");
                let _ = manager.events.send(SessionEvent::SignedOut { expired: true });
            }
            Err(_) => {
                tracing::warn!("Stored token could not be decoded, ignoring it");
            }
        }

        manager
    }

    /// Persist a fresh login and arm the expiry watcher.
    pub fn handle_login(&self, token: String, user: StoredUser) {
        let expires_at = decode_claims(&token).map(|c| c.expires_at());

        let mut guard = lock(&self.inner);
        guard.token = Some(token);
        guard.user = Some(user);

        match expires_at {
            Ok(exp) if exp > OffsetDateTime::now_utc() => {
                self.schedule_watcher(&mut guard, exp);
                drop(guard);
                let _ = self.events.send(SessionEvent::SignedIn);
            }
            Ok(_) => {
                // Token was dead on arrival
                drop(guard);
                self.clear(true);
            }
            Err(_) => {
                // No readable expiry claim: keep the session, run no watcher
                tracing::warn!("Token payload undecodable, expiry watcher not armed");
                drop(guard);
                let _ = self.events.send(SessionEvent::SignedIn);
            }
        }
    }

    /// Replace the stored token after the server reissued one (username
    /// change). Reschedules the watcher from the new expiry claim, aborting
    /// the previous timer first.
    pub fn apply_reissued_token(&self, token: &str) {
        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(_) => {
                tracing::warn!("Reissued token undecodable, keeping current session");
                return;
            }
        };

        let mut guard = lock(&self.inner);
        if guard.token.is_none() {
            tracing::warn!("Ignoring reissued token: no live session");
            return;
        }

        guard.token = Some(token.to_string());
        if let Some(user) = guard.user.as_mut() {
            user.uname = claims.uname.clone();
            user.email = claims.email.clone();
        }

        let expires_at = claims.expires_at();
        self.schedule_watcher(&mut guard, expires_at);
    }

    /// Explicit logout: clears all stored state synchronously, then emits
    /// the sign-out event.
    pub fn logout(&self) {
        self.clear(false);
    }

    pub fn is_authenticated(&self) -> bool {
        let guard = lock(&self.inner);
        guard
            .token
            .as_deref()
            .and_then(|token| decode_claims(token).ok())
            .map(|claims| !claims.is_expired())
            .unwrap_or(false)
    }

    pub fn current_user(&self) -> Option<StoredUser> {
        lock(&self.inner).user.clone()
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.inner).token.clone()
    }

    /// Observe session transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn clear(&self, expired: bool) {
        let mut guard = lock(&self.inner);
        if let Some(handle) = guard.watcher.take() {
            handle.abort();
        }
        guard.generation += 1;
        let had_session = guard.token.take().is_some();
        guard.user = None;
        drop(guard);

        if had_session {
            let _ = self.events.send(SessionEvent::SignedOut { expired });
        }
    }

    /// Arm the one-shot expiry timer. At most one watcher is ever live: the
    /// previous handle is aborted and the generation bump neutralizes a
    /// watcher that already woke but has not run yet.
    fn schedule_watcher(&self, guard: &mut Inner, expires_at: OffsetDateTime) {
        if let Some(handle) = guard.watcher.take() {
            handle.abort();
        }
        guard.generation += 1;
        let generation = guard.generation;

        let remaining = expires_at - OffsetDateTime::now_utc();
        let delay = std::time::Duration::try_from(remaining).unwrap_or_default();

        let inner = self.inner.clone();
        let events = self.events.clone();
        guard.watcher = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            expire_session(&inner, &events, generation);
        }));
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn expire_session(
    inner: &Arc<Mutex<Inner>>,
    events: &watch::Sender<SessionEvent>,
    generation: u64,
) {
    let mut guard = lock(inner);
    if guard.generation != generation || guard.token.is_none() {
        // A newer login or an explicit logout superseded this timer
        return;
    }

    guard.token = None;
    guard.user = None;
    guard.watcher = None;
    drop(guard);

    let _ = events.send(SessionEvent::SignedOut { expired: true });
    tracing::info!("Session expired, local state cleared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::make_unsigned_token;
    use std::time::Duration;

    fn token_expiring_in(secs: i64) -> (String, StoredUser) {
        let id = Uuid::new_v4();
        let exp = OffsetDateTime::now_utc().unix_timestamp() + secs;
        let token = make_unsigned_token(id, "alice", "a@x.com", exp);
        let user = StoredUser {
            id,
            uname: "alice".to_string(),
            email: "a@x.com".to_string(),
        };
        (token, user)
    }

    #[tokio::test(start_paused = true)]
    async fn login_stores_state_and_emits_signed_in() {
        let manager = SessionManager::new();
        let mut events = manager.subscribe();
        let (token, user) = token_expiring_in(3600);

        manager.handle_login(token.clone(), user.clone());

        assert!(manager.is_authenticated());
        assert_eq!(manager.token(), Some(token));
        assert_eq!(manager.current_user(), Some(user));
        events.changed().await.unwrap();
        assert_eq!(*events.borrow(), SessionEvent::SignedIn);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_fires_at_expiry_and_clears_state() {
        let manager = SessionManager::new();
        let (token, user) = token_expiring_in(3600);
        manager.handle_login(token, user);

        let mut events = manager.subscribe();
        events.mark_unchanged();

        // Paused clock auto-advances to the pending timer
        events.changed().await.unwrap();

        assert_eq!(*events.borrow(), SessionEvent::SignedOut { expired: true });
        assert!(!manager.is_authenticated());
        assert!(manager.token().is_none());
        assert!(manager.current_user().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_logout_clears_synchronously() {
        let manager = SessionManager::new();
        let (token, user) = token_expiring_in(3600);
        manager.handle_login(token, user);

        manager.logout();

        // Cleared before any await point
        assert!(manager.token().is_none());
        assert!(manager.current_user().is_none());
        assert!(!manager.is_authenticated());

        let events = manager.subscribe();
        assert_eq!(*events.borrow(), SessionEvent::SignedOut { expired: false });
    }

    #[tokio::test(start_paused = true)]
    async fn reissued_token_reschedules_instead_of_double_firing() {
        let manager = SessionManager::new();
        let (token, user) = token_expiring_in(100);
        manager.handle_login(token, user);

        // Server reissued with a later expiry (username change)
        let exp = OffsetDateTime::now_utc().unix_timestamp() + 7200;
        let reissued =
            make_unsigned_token(manager.current_user().unwrap().id, "alicia", "a@x.com", exp);
        manager.apply_reissued_token(&reissued);

        // The user projection follows the new claims
        assert_eq!(manager.current_user().unwrap().uname, "alicia");

        // Past the first token's expiry: the old timer must not fire
        let mut events = manager.subscribe();
        events.mark_unchanged();
        tokio::time::advance(Duration::from_secs(150)).await;
        tokio::task::yield_now().await;
        assert!(!events.has_changed().unwrap());
        assert!(manager.is_authenticated());

        // The rescheduled timer still fires at the new expiry
        events.changed().await.unwrap();
        assert_eq!(*events.borrow(), SessionEvent::SignedOut { expired: true });
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_log_out_a_fresh_session() {
        let manager = SessionManager::new();
        let (token, user) = token_expiring_in(10);
        manager.handle_login(token, user);

        manager.logout();

        let (fresh_token, fresh_user) = token_expiring_in(3600);
        manager.handle_login(fresh_token, fresh_user);

        // Walk past the first token's expiry; the fresh session survives
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert!(manager.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_with_live_token_restores_the_session() {
        let (token, _) = token_expiring_in(3600);
        let manager = SessionManager::resume(token);

        assert!(manager.is_authenticated());
        assert_eq!(manager.current_user().unwrap().uname, "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn resume_with_expired_token_signals_expiry() {
        let (token, _) = token_expiring_in(-10);
        let manager = SessionManager::resume(token);

        assert!(!manager.is_authenticated());
        assert!(manager.token().is_none());
        let events = manager.subscribe();
        assert_eq!(*events.borrow(), SessionEvent::SignedOut { expired: true });
    }

    #[tokio::test(start_paused = true)]
    async fn resume_with_garbage_token_stays_signed_out() {
        let manager = SessionManager::resume("not-a-token".to_string());
        assert!(!manager.is_authenticated());
        assert!(manager.token().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reissue_without_a_session_is_ignored() {
        let manager = SessionManager::new();
        let (token, _) = token_expiring_in(3600);
        manager.apply_reissued_token(&token);
        assert!(!manager.is_authenticated());
    }
}
