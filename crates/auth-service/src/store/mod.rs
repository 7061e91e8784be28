//! Session store: the revocation ledger for issued credentials.
//!
//! Every issued credential is written under its verbatim token with the
//! credential's own expiry. A credential whose entry is absent is revoked,
//! regardless of its signature or `exp` claim.

mod redis_store;

pub use redis_store::RedisSessionStore;

use crate::errors::AuthError;
use crate::models::CredentialKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value stored under a credential key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub kind: CredentialKind,
    /// Unix seconds; the store drops the entry at this instant.
    pub expires_at: i64,
}

/// A credential key together with its record.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub token: String,
    pub record: SessionRecord,
}

impl fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEntry")
            .field("token", &"[REDACTED]")
            .field("record", &self.record)
            .finish()
    }
}

/// Shared key/expiry store consulted on every verification.
///
/// Implementations must be safe for concurrent use from many tasks.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write all entries in one atomic operation.
    async fn set(&self, entries: &[SessionEntry]) -> Result<(), AuthError>;

    /// Look up a credential. `None` means revoked or expired.
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, AuthError>;

    /// Remove credentials, returning how many were present.
    async fn delete(&self, tokens: &[&str]) -> Result<u64, AuthError>;
}
