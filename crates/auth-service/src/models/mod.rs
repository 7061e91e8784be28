use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role. Closed set; unknown values fail to decode.
///
/// Serialized as lowercase strings in credentials and the users table, and
/// as `auth_proto::role` integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
    Committee,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Committee => "committee",
        }
    }

    pub const fn to_wire(self) -> i32 {
        match self {
            Role::Admin => auth_proto::role::ADMIN,
            Role::Customer => auth_proto::role::CUSTOMER,
            Role::Committee => auth_proto::role::COMMITTEE,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            auth_proto::role::ADMIN => Some(Role::Admin),
            auth_proto::role::CUSTOMER => Some(Role::Customer),
            auth_proto::role::COMMITTEE => Some(Role::Committee),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            "committee" => Ok(Role::Committee),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Which secret, lifetime and liveness message a credential uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Access,
    Refresh,
}

impl CredentialKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            CredentialKind::Access => "access",
            CredentialKind::Refresh => "refresh",
        }
    }

    /// Unauthenticated message for a revoked or expired credential of this kind.
    pub const fn expired_message(self) -> &'static str {
        match self {
            CredentialKind::Access => "token expired",
            CredentialKind::Refresh => "refresh token expired",
        }
    }
}

/// User account as stored in the user store.
///
/// The password hash is redacted in Debug output.
#[derive(Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("note", &self.note)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}

impl User {
    /// Inactive and soft-deleted accounts may not hold sessions.
    pub fn can_authenticate(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            display_name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
            deleted_at: self.deleted_at,
        }
    }
}

/// The subset of a user that credential issuance reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields for a new account. The password is already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub note: String,
}

/// Mutable account fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: String,
    pub is_active: bool,
    pub note: String,
}

/// Listing filter. `search` matches name or email, case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub search: Option<String>,
    pub is_active: bool,
}

/// A freshly issued access/refresh credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Claims carried by a signed credential and attached to a verified call.
///
/// Access credentials carry `name` and `role`; refresh credentials carry
/// only the subject. `jti` keeps credentials issued in the same second
/// distinct. The `sub` field is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl fmt::Debug for RequestClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClaims")
            .field("sub", &"[REDACTED]")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish_non_exhaustive()
    }
}

impl RequestClaims {
    /// Subject as a user id.
    pub fn subject_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Verified caller attached to a request by the gate.
///
/// Holds the claims and the credential they were read from, so handlers
/// can revoke the exact credential that authenticated the call.
#[derive(Clone)]
pub struct AuthContext {
    pub claims: RequestClaims,
    pub token: String,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("claims", &self.claims)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
