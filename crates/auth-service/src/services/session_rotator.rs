//! Refresh-credential rotation.

use crate::errors::AuthError;
use crate::models::{CredentialKind, TokenPair};
use crate::observability::hash_for_correlation;
use crate::repositories::users::UserRepository;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::credential_verifier::CredentialVerifier;
use crate::services::{bounded, TokenSettings};
use crate::store::SessionStore;
use std::sync::Arc;
use tracing::instrument;

/// Unauthenticated message for inactive or soft-deleted accounts.
pub const ACCOUNT_DELETED_MESSAGE: &str = "your account has been deleted";

/// Exchanges a live refresh credential for a new pair.
#[derive(Clone)]
pub struct SessionRotator {
    verifier: CredentialVerifier,
    issuer: CredentialIssuer,
    users: Arc<dyn UserRepository>,
    store: Arc<dyn SessionStore>,
    settings: Arc<TokenSettings>,
}

impl SessionRotator {
    pub fn new(
        verifier: CredentialVerifier,
        issuer: CredentialIssuer,
        users: Arc<dyn UserRepository>,
        store: Arc<dyn SessionStore>,
        settings: Arc<TokenSettings>,
    ) -> Self {
        Self {
            verifier,
            issuer,
            users,
            store,
            settings,
        }
    }

    /// Rotate a session.
    ///
    /// # Steps
    ///
    /// 1. Verify the refresh credential (errors propagate unchanged)
    /// 2. Load the subject; missing is `NotFound`, inactive or deleted is
    ///    `Unauthenticated`
    /// 3. Issue and record a new pair
    /// 4. Revoke the old access and refresh credentials (absent is fine).
    ///    The access credential is only revoked when it carries a valid
    ///    access signature for the same subject as the refresh credential.
    ///
    /// The new pair is recorded before the old one is revoked, so a failure
    /// in step 4 leaves both pairs usable rather than neither.
    #[instrument(skip_all)]
    pub async fn rotate(
        &self,
        access_token: &str,
        refresh_token: &str,
        now: i64,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.verifier.verify_refresh(refresh_token, now).await?;

        let user_id = claims
            .subject_id()
            .ok_or_else(|| AuthError::unauthenticated(crate::crypto::INVALID_TOKEN))?;

        let user = bounded(
            self.settings.timeout,
            "user_store.get_by_id",
            self.users.get_by_id(user_id),
        )
        .await?
        .ok_or_else(|| AuthError::not_found(format!("user with id {} not found", user_id)))?;

        if !user.can_authenticate() {
            tracing::info!(
                target: "auth.credentials",
                user = %hash_for_correlation(&user_id.to_string()),
                "Refresh rejected for inactive account"
            );
            return Err(AuthError::unauthenticated(ACCOUNT_DELETED_MESSAGE));
        }

        let pair = self.issuer.issue_pair(&user.identity(), now).await?;

        let mut old = vec![refresh_token];
        if self.same_subject_access(access_token, &claims.sub) {
            old.push(access_token);
        } else if !access_token.is_empty() {
            tracing::debug!(
                target: "auth.credentials",
                user = %hash_for_correlation(&user_id.to_string()),
                "Presented access credential not paired with refresh credential, leaving it"
            );
        }
        let removed = bounded(
            self.settings.timeout,
            "session_store.delete",
            self.store.delete(&old),
        )
        .await?;

        tracing::debug!(
            target: "auth.credentials",
            user = %hash_for_correlation(&user_id.to_string()),
            removed,
            "Rotated session"
        );

        Ok(pair)
    }

    fn same_subject_access(&self, access_token: &str, subject: &str) -> bool {
        if access_token.is_empty() {
            return false;
        }
        self.verifier
            .check_signature(CredentialKind::Access, access_token)
            .map(|access| access.sub == subject)
            .unwrap_or(false)
    }
}
