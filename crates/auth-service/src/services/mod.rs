pub mod credential_issuer;
pub mod credential_verifier;
pub mod login_service;
pub mod session_rotator;
pub mod user_service;

use crate::config::Config;
use crate::errors::AuthError;
use crate::models::CredentialKind;
use common::secret::SecretString;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Signing secrets, lifetimes and the per-call timeout shared by the
/// credential services.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Bound on every store and user-store call.
    pub timeout: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TokenSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            timeout: config.context_timeout,
        }
    }

    pub fn secret(&self, kind: CredentialKind) -> &SecretString {
        match kind {
            CredentialKind::Access => &self.access_secret,
            CredentialKind::Refresh => &self.refresh_secret,
        }
    }

    pub fn ttl(&self, kind: CredentialKind) -> Duration {
        match kind {
            CredentialKind::Access => self.access_ttl,
            CredentialKind::Refresh => self.refresh_ttl,
        }
    }
}

/// Current time in Unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Run a store or database call under the per-call timeout.
///
/// On elapse the inner future is dropped and the call fails with
/// `AuthError::Timeout`, which callers see as `Internal`.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                target: "auth.timeout",
                operation,
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "Call exceeded context timeout"
            );
            Err(AuthError::Timeout(operation))
        }
    }
}
