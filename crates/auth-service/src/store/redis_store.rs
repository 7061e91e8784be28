//! Redis-backed session store.
//!
//! # Key Patterns
//!
//! - `<token>` - JSON `SessionRecord`, expiring at the credential's `exp`
//!   via `SET key value EXAT <unix seconds>`
//!
//! # Connection Pattern
//!
//! `MultiplexedConnection` is cheap to clone and safe for concurrent use,
//! so each operation clones it instead of locking.

use super::{SessionEntry, SessionRecord, SessionStore};
use crate::errors::AuthError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{error, instrument, warn};

/// Session store over a shared Redis connection.
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: MultiplexedConnection,
}

impl RedisSessionStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the client cannot be opened or the
    /// connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, AuthError> {
        let client = Client::open(redis_url).map_err(|e| {
            // The URL may carry credentials; never log it
            error!(target: "auth.store", error = %e, "Failed to open Redis client");
            AuthError::Store(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "auth.store", error = %e, "Failed to connect to Redis");
                AuthError::Store(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self { connection })
    }

    /// Wrap an existing connection.
    pub fn from_connection(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip_all, fields(entries = entries.len()))]
    async fn set(&self, entries: &[SessionEntry]) -> Result<(), AuthError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for entry in entries {
            let value = serde_json::to_string(&entry.record).map_err(|e| {
                AuthError::Store(format!("Failed to serialize session record: {e}"))
            })?;
            pipe.cmd("SET")
                .arg(&entry.token)
                .arg(value)
                .arg("EXAT")
                .arg(entry.record.expires_at)
                .ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(|e| {
            warn!(target: "auth.store", error = %e, "Failed to write session entries");
            AuthError::Store(format!("Failed to write session entries: {e}"))
        })?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, AuthError> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn.get(token).await.map_err(|e| {
            warn!(target: "auth.store", error = %e, "Failed to read session entry");
            AuthError::Store(format!("Failed to read session entry: {e}"))
        })?;

        match result {
            Some(json) => {
                let record: SessionRecord = serde_json::from_str(&json).map_err(|e| {
                    error!(target: "auth.store", error = %e, "Failed to deserialize session record");
                    AuthError::Store(format!("Failed to deserialize session record: {e}"))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(tokens = tokens.len()))]
    async fn delete(&self, tokens: &[&str]) -> Result<u64, AuthError> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(tokens).await.map_err(|e| {
            warn!(target: "auth.store", error = %e, "Failed to delete session entries");
            AuthError::Store(format!("Failed to delete session entries: {e}"))
        })?;

        Ok(removed)
    }
}
