//! Login and logout orchestration.
//!
//! # Security
//!
//! - Unknown email, wrong password and wrong role share one message
//! - A dummy bcrypt comparison runs for unknown emails so response time
//!   does not reveal which accounts exist
//! - Logout only revokes a refresh credential owned by the caller

use crate::crypto::{self, DUMMY_PASSWORD_HASH};
use crate::errors::AuthError;
use crate::models::{AuthContext, CredentialKind, Role, TokenPair};
use crate::observability::hash_for_correlation;
use crate::repositories::users::UserRepository;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::credential_verifier::CredentialVerifier;
use crate::services::session_rotator::ACCOUNT_DELETED_MESSAGE;
use crate::services::{bounded, TokenSettings};
use crate::store::SessionStore;
use std::sync::Arc;
use tracing::instrument;

/// InvalidArgument message for every failed login.
pub const INVALID_LOGIN_MESSAGE: &str = "incorrect email or password";

/// InvalidArgument message when the refresh credential is not the caller's.
pub const FOREIGN_REFRESH_MESSAGE: &str = "refresh token does not belong to the caller";

/// Trim and lowercase an email for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authenticates users and ends their sessions.
#[derive(Clone)]
pub struct LoginService {
    users: Arc<dyn UserRepository>,
    issuer: CredentialIssuer,
    verifier: CredentialVerifier,
    store: Arc<dyn SessionStore>,
    settings: Arc<TokenSettings>,
}

impl LoginService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        issuer: CredentialIssuer,
        verifier: CredentialVerifier,
        store: Arc<dyn SessionStore>,
        settings: Arc<TokenSettings>,
    ) -> Self {
        Self {
            users,
            issuer,
            verifier,
            store,
            settings,
        }
    }

    /// Authenticate `email`/`password` for a login endpoint that only
    /// admits `required_role`, and issue a new credential pair.
    #[instrument(skip_all, fields(role = %required_role))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        required_role: Role,
        now: i64,
    ) -> Result<TokenPair, AuthError> {
        let email = normalize_email(email);

        let user = bounded(
            self.settings.timeout,
            "user_store.get_by_email",
            self.users.get_by_email(&email),
        )
        .await?;

        // Compare against a dummy hash when the account does not exist
        let hash_to_verify = match &user {
            Some(u) => u.password_hash.as_str(),
            None => DUMMY_PASSWORD_HASH,
        };
        let password_matches = crypto::verify_password(password, hash_to_verify)?;

        let Some(user) = user else {
            tracing::debug!(
                target: "auth.login",
                email = %hash_for_correlation(&email),
                "Login failed: unknown email"
            );
            return Err(AuthError::invalid_argument(INVALID_LOGIN_MESSAGE));
        };

        if !password_matches {
            tracing::debug!(
                target: "auth.login",
                user = %hash_for_correlation(&user.id.to_string()),
                "Login failed: password mismatch"
            );
            return Err(AuthError::invalid_argument(INVALID_LOGIN_MESSAGE));
        }

        if user.role != required_role {
            tracing::debug!(
                target: "auth.login",
                user = %hash_for_correlation(&user.id.to_string()),
                "Login failed: role not admitted by this endpoint"
            );
            return Err(AuthError::invalid_argument(INVALID_LOGIN_MESSAGE));
        }

        if !user.can_authenticate() {
            return Err(AuthError::unauthenticated(ACCOUNT_DELETED_MESSAGE));
        }

        let pair = self.issuer.issue_pair(&user.identity(), now).await?;

        tracing::info!(
            target: "auth.login",
            user = %hash_for_correlation(&user.id.to_string()),
            role = %user.role,
            "Login succeeded"
        );

        Ok(pair)
    }

    /// Revoke the caller's access credential and its paired refresh
    /// credential. Already-absent entries are not an error.
    ///
    /// The refresh credential must verify against the refresh secret (its
    /// expiry is ignored) and name the same subject as the caller;
    /// otherwise nothing is revoked.
    #[instrument(skip_all)]
    pub async fn logout(&self, caller: &AuthContext, refresh_token: &str) -> Result<(), AuthError> {
        let owned = self
            .verifier
            .check_signature(CredentialKind::Refresh, refresh_token)
            .map(|claims| claims.sub == caller.claims.sub)
            .unwrap_or(false);

        if !owned {
            tracing::debug!(
                target: "auth.login",
                user = %hash_for_correlation(&caller.claims.sub),
                "Logout rejected: refresh credential not owned by caller"
            );
            return Err(AuthError::invalid_argument(FOREIGN_REFRESH_MESSAGE));
        }

        let removed = bounded(
            self.settings.timeout,
            "session_store.delete",
            self.store.delete(&[caller.token.as_str(), refresh_token]),
        )
        .await?;

        tracing::info!(
            target: "auth.login",
            user = %hash_for_correlation(&caller.claims.sub),
            removed,
            "Logout succeeded"
        );

        Ok(())
    }
}
