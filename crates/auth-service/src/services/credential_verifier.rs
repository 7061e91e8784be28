//! Credential verification.
//!
//! A credential is valid only if all three hold, checked in this order:
//! 1. its session entry is present (liveness)
//! 2. its HS256 signature verifies against the secret for its kind
//! 3. `now < exp`

use crate::crypto::{self, INVALID_TOKEN};
use crate::errors::AuthError;
use crate::models::{CredentialKind, RequestClaims};
use crate::services::{bounded, TokenSettings};
use crate::store::SessionStore;
use common::jwt::{parse_bearer, AUTHORIZATION_HEADER};
use http::HeaderMap;
use std::sync::Arc;
use tracing::instrument;

/// Extract the bearer credential from request headers.
///
/// # Errors
///
/// - `Unauthenticated("authorization token is not provided")` if absent
/// - `Unauthenticated("invalid access token format")` for anything other
///   than exactly `Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = match headers.get(AUTHORIZATION_HEADER) {
        None => None,
        Some(raw) => Some(raw.to_str().map_err(|_| {
            AuthError::unauthenticated(common::jwt::BearerError::InvalidFormat.to_string())
        })?),
    };

    parse_bearer(value)
        .map(str::to_owned)
        .map_err(|e| AuthError::unauthenticated(e.to_string()))
}

/// Checks liveness, signature and expiry of presented credentials.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn SessionStore>,
    settings: Arc<TokenSettings>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn SessionStore>, settings: Arc<TokenSettings>) -> Self {
        Self { store, settings }
    }

    /// Verify an access credential. Access claims must carry a role.
    pub async fn verify_access(&self, token: &str, now: i64) -> Result<RequestClaims, AuthError> {
        self.verify(CredentialKind::Access, token, now).await
    }

    /// Verify a refresh credential.
    pub async fn verify_refresh(&self, token: &str, now: i64) -> Result<RequestClaims, AuthError> {
        self.verify(CredentialKind::Refresh, token, now).await
    }

    /// Verify a credential of the given kind.
    #[instrument(skip_all, fields(kind = kind.as_str()))]
    pub async fn verify(
        &self,
        kind: CredentialKind,
        token: &str,
        now: i64,
    ) -> Result<RequestClaims, AuthError> {
        let entry = bounded(
            self.settings.timeout,
            "session_store.get",
            self.store.get(token),
        )
        .await?;

        if entry.is_none() {
            tracing::debug!(target: "auth.credentials", kind = kind.as_str(), "Credential not live");
            return Err(AuthError::unauthenticated(kind.expired_message()));
        }

        let claims = self.check_signature(kind, token)?;

        if now >= claims.exp {
            tracing::debug!(target: "auth.credentials", kind = kind.as_str(), "Credential expired");
            return Err(AuthError::unauthenticated(kind.expired_message()));
        }

        Ok(claims)
    }

    /// Signature and shape checks only; liveness and expiry are ignored.
    ///
    /// Used to establish who a presented credential belongs to without
    /// requiring it to still be usable.
    pub fn check_signature(
        &self,
        kind: CredentialKind,
        token: &str,
    ) -> Result<RequestClaims, AuthError> {
        let claims = crypto::verify_signature(token, self.settings.secret(kind))?;

        if claims.subject_id().is_none() {
            return Err(AuthError::unauthenticated(INVALID_TOKEN));
        }

        if kind == CredentialKind::Access && claims.role.is_none() {
            tracing::debug!(target: "auth.credentials", "Access credential without role");
            return Err(AuthError::unauthenticated(INVALID_TOKEN));
        }

        Ok(claims)
    }
}
