//! Credential issuance.
//!
//! Signs access and refresh credentials for an identity and records each
//! one in the session store with the credential's own expiry. Issuance
//! never consults the user store.

use crate::crypto;
use crate::errors::AuthError;
use crate::models::{CredentialKind, Identity, RequestClaims, TokenPair};
use crate::observability::hash_for_correlation;
use crate::services::{bounded, TokenSettings};
use crate::store::{SessionEntry, SessionRecord, SessionStore};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Build the claims for a credential of `kind` issued at `now`.
///
/// Refresh claims carry only the subject.
pub fn build_claims(
    identity: &Identity,
    kind: CredentialKind,
    settings: &TokenSettings,
    now: i64,
) -> RequestClaims {
    let ttl_secs = i64::try_from(settings.ttl(kind).as_secs()).unwrap_or(i64::MAX);
    let (name, role) = match kind {
        CredentialKind::Access => (Some(identity.display_name.clone()), Some(identity.role)),
        CredentialKind::Refresh => (None, None),
    };

    RequestClaims {
        sub: identity.user_id.to_string(),
        name,
        role,
        iat: now,
        exp: now.saturating_add(ttl_secs),
        jti: Uuid::new_v4().to_string(),
    }
}

/// Issues signed credentials and records them as live sessions.
#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn SessionStore>,
    settings: Arc<TokenSettings>,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn SessionStore>, settings: Arc<TokenSettings>) -> Self {
        Self { store, settings }
    }

    fn sign(
        &self,
        identity: &Identity,
        kind: CredentialKind,
        now: i64,
    ) -> Result<SessionEntry, AuthError> {
        let claims = build_claims(identity, kind, &self.settings, now);
        let token = crypto::sign_claims(&claims, self.settings.secret(kind))?;

        Ok(SessionEntry {
            token,
            record: SessionRecord {
                kind,
                expires_at: claims.exp,
            },
        })
    }

    async fn record(&self, entries: &[SessionEntry]) -> Result<(), AuthError> {
        bounded(
            self.settings.timeout,
            "session_store.set",
            self.store.set(entries),
        )
        .await
    }

    /// Issue an access credential (`exp = now + access_ttl`).
    #[instrument(skip_all)]
    pub async fn issue_access(&self, identity: &Identity, now: i64) -> Result<String, AuthError> {
        let entry = self.sign(identity, CredentialKind::Access, now)?;
        self.record(std::slice::from_ref(&entry)).await?;
        Ok(entry.token)
    }

    /// Issue a refresh credential (`exp = now + refresh_ttl`), no role embedded.
    #[instrument(skip_all)]
    pub async fn issue_refresh(&self, identity: &Identity, now: i64) -> Result<String, AuthError> {
        let entry = self.sign(identity, CredentialKind::Refresh, now)?;
        self.record(std::slice::from_ref(&entry)).await?;
        Ok(entry.token)
    }

    /// Issue both credentials and record them in one atomic store write.
    #[instrument(skip_all)]
    pub async fn issue_pair(&self, identity: &Identity, now: i64) -> Result<TokenPair, AuthError> {
        let access = self.sign(identity, CredentialKind::Access, now)?;
        let refresh = self.sign(identity, CredentialKind::Refresh, now)?;

        let entries = [access, refresh];
        self.record(&entries).await?;

        tracing::debug!(
            target: "auth.credentials",
            user = %hash_for_correlation(&identity.user_id.to_string()),
            role = %identity.role,
            "Issued credential pair"
        );

        let [access, refresh] = entries;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }
}
