//! Per-operation access policy.
//!
//! One map from gRPC path to the credential an operation requires and,
//! optionally, the roles allowed to call it. Paths absent from the map
//! are public.

use crate::errors::AuthError;
use crate::models::{CredentialKind, RequestClaims, Role};
use auth_proto::SERVICE_PATH;
use std::collections::HashMap;
use thiserror::Error;

/// Unauthenticated message when the caller's role is not allowed.
pub const ROLE_NOT_ALLOWED_MESSAGE: &str = "not allowed to access this resource";

/// Access requirement for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub credential: CredentialKind,
    /// `None` admits any verified caller.
    pub roles: Option<Vec<Role>>,
}

impl Policy {
    pub fn access() -> Self {
        Self {
            credential: CredentialKind::Access,
            roles: None,
        }
    }

    pub fn access_for(roles: &[Role]) -> Self {
        Self {
            credential: CredentialKind::Access,
            roles: Some(roles.to_vec()),
        }
    }

    pub fn refresh() -> Self {
        Self {
            credential: CredentialKind::Refresh,
            roles: None,
        }
    }

    /// Check the caller's role against the allow-list.
    ///
    /// Fails closed when claims or their role are missing.
    pub fn authorize(&self, claims: Option<&RequestClaims>) -> Result<(), AuthError> {
        let Some(allowed) = &self.roles else {
            return Ok(());
        };

        match claims.and_then(|c| c.role) {
            Some(role) if allowed.contains(&role) => Ok(()),
            _ => Err(AuthError::unauthenticated(ROLE_NOT_ALLOWED_MESSAGE)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy for {0} restricts roles on a refresh credential, which carries no role")]
    RolesOnRefresh(String),
}

/// Operation path to policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: HashMap<String, Policy>,
}

impl PolicyTable {
    /// Build a table, rejecting role lists on refresh-credential policies.
    pub fn new<I, P>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (P, Policy)>,
        P: Into<String>,
    {
        let mut policies = HashMap::new();
        for (path, policy) in entries {
            let path = path.into();
            if policy.credential == CredentialKind::Refresh && policy.roles.is_some() {
                return Err(PolicyError::RolesOnRefresh(path));
            }
            policies.insert(path, policy);
        }
        Ok(Self { policies })
    }

    /// Policies for `auth.AuthService`.
    ///
    /// Logins and `RefreshToken` are public; the refresh credential for
    /// rotation travels in the request body and is verified by the handler.
    pub fn auth_service() -> Result<Self, PolicyError> {
        let admin = [Role::Admin];
        let path = |method: &str| format!("{SERVICE_PATH}{method}");

        Self::new([
            (path("Verify"), Policy::access()),
            (path("Logout"), Policy::access()),
            (path("GetProfileByID"), Policy::access()),
            (path("ChangePassword"), Policy::access()),
            (path("CreateUser"), Policy::access_for(&admin)),
            (path("GetAllUser"), Policy::access_for(&admin)),
            (path("GetUserByID"), Policy::access_for(&admin)),
            (path("UpdateUser"), Policy::access_for(&admin)),
            (path("DeleteUser"), Policy::access_for(&admin)),
        ])
    }

    /// Policy for a gRPC path, `None` if the operation is public.
    pub fn get(&self, path: &str) -> Option<&Policy> {
        self.policies.get(path)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
