//! In-memory session store for credential lifecycle testing.
//!
//! Behaves like the Redis-backed store: entries vanish once their
//! `expires_at` is reached, and `set` writes all entries or none. On top of
//! that it can:
//! - Pin the clock it expires entries against
//! - Fail every call (store unavailable)
//! - Fail only deletes, so writes land but revocation does not
//! - Delay every call (for timeout tests under paused time)
//!
//! # Example
//!
//! ```rust,ignore
//! use auth_test_utils::MockSessionStore;
//!
//! let store = MockSessionStore::new().with_now(1_700_000_000);
//! store.set_failing(true);
//! ```

use async_trait::async_trait;
use auth_service::errors::AuthError;
use auth_service::services::unix_now;
use auth_service::store::{SessionEntry, SessionRecord, SessionStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock session store for testing issuance, verification and revocation.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    inner: Arc<Mutex<MockSessionStoreInner>>,
}

#[derive(Debug, Default)]
struct MockSessionStoreInner {
    entries: HashMap<String, SessionRecord>,
    /// Fixed clock; `None` follows wall time.
    now: Option<i64>,
    failing: bool,
    fail_deletes: bool,
    delay: Option<Duration>,
    set_calls: usize,
}

impl MockSessionStore {
    /// Create a new empty store following wall time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the clock used to expire entries.
    #[must_use]
    pub fn with_now(self, now: i64) -> Self {
        self.set_now(now);
        self
    }

    /// Delay every call by `delay`.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn set_now(&self, now: i64) {
        self.inner.lock().unwrap().now = Some(now);
    }

    /// Make every subsequent call fail as if the store were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    /// Make subsequent `delete` calls fail while `set` and `get` still work.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_deletes = fail;
    }

    /// Remove an entry behind the service's back.
    pub fn evict(&self, token: &str) -> bool {
        self.inner.lock().unwrap().entries.remove(token).is_some()
    }

    /// Whether a live entry exists for `token`.
    pub fn contains(&self, token: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.purge_expired();
        inner.entries.contains_key(token)
    }

    /// Record stored under `token`, ignoring expiry.
    pub fn record(&self, token: &str) -> Option<SessionRecord> {
        self.inner.lock().unwrap().entries.get(token).copied()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.purge_expired();
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `set` calls received, including failed ones.
    pub fn set_calls(&self) -> usize {
        self.inner.lock().unwrap().set_calls
    }

    /// Apply the configured delay and failure mode.
    async fn before_call(&self) -> Result<(), AuthError> {
        let (delay, failing) = {
            let inner = self.inner.lock().unwrap();
            (inner.delay, inner.failing)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(AuthError::Store("mock session store unavailable".to_string()));
        }
        Ok(())
    }
}

impl MockSessionStoreInner {
    fn now(&self) -> i64 {
        self.now.unwrap_or_else(unix_now)
    }

    fn purge_expired(&mut self) {
        let now = self.now();
        self.entries.retain(|_, record| record.expires_at > now);
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn set(&self, entries: &[SessionEntry]) -> Result<(), AuthError> {
        self.inner.lock().unwrap().set_calls += 1;
        self.before_call().await?;

        let mut inner = self.inner.lock().unwrap();
        for entry in entries {
            inner.entries.insert(entry.token.clone(), entry.record);
        }
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, AuthError> {
        self.before_call().await?;

        let mut inner = self.inner.lock().unwrap();
        inner.purge_expired();
        Ok(inner.entries.get(token).copied())
    }

    async fn delete(&self, tokens: &[&str]) -> Result<u64, AuthError> {
        self.before_call().await?;

        if self.inner.lock().unwrap().fail_deletes {
            return Err(AuthError::Store("mock session store rejected DEL".to_string()));
        }

        let mut inner = self.inner.lock().unwrap();
        inner.purge_expired();
        let removed = tokens
            .iter()
            .filter(|token| inner.entries.remove(**token).is_some())
            .count();
        Ok(removed as u64)
    }
}
