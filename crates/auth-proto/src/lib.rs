//! Protocol Buffer messages and generated gRPC stubs for the auth service.
//!
//! Messages are declared with prost derives; the `auth.AuthService` server
//! and client are generated by `build.rs`.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting

use std::fmt;

// Re-export prost traits for convenience
pub use prost::Message;

/// Fully-qualified gRPC path prefix for every `AuthService` operation.
pub const SERVICE_PATH: &str = "/auth.AuthService/";

/// Generated `auth.AuthService` server and client.
#[allow(clippy::pedantic, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/auth.AuthService.rs"));
}

pub use generated::{auth_service_client, auth_service_server};

/// Role values on the wire.
pub mod role {
    pub const ADMIN: i32 = 1;
    pub const CUSTOMER: i32 = 2;
    pub const COMMITTEE: i32 = 3;
}

const REDACTED: &str = "[REDACTED]";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BaseResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &REDACTED)
            .field("refresh_token", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct RefreshTokenRequest {
    /// The access credential paired with `refresh_token`; revoked on success.
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
}

impl fmt::Debug for RefreshTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenRequest")
            .field("access_token", &REDACTED)
            .field("refresh_token", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct RefreshTokenResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
}

impl fmt::Debug for RefreshTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenResponse")
            .field("access_token", &REDACTED)
            .field("refresh_token", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct LogoutRequest {
    #[prost(string, tag = "1")]
    pub refresh_token: String,
}

impl fmt::Debug for LogoutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutRequest")
            .field("refresh_token", &REDACTED)
            .finish()
    }
}

/// Claims of the calling access credential.
#[derive(Clone, PartialEq, prost::Message)]
pub struct VerifyResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(int32, tag = "3")]
    pub role: i32,
    #[prost(int64, tag = "4")]
    pub expires_at: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct CreateUserRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int32, tag = "2")]
    pub role: i32,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub password: String,
    #[prost(bool, tag = "5")]
    pub is_active: bool,
    #[prost(string, tag = "6")]
    pub note: String,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .field("is_active", &self.is_active)
            .field("note", &self.note)
            .finish()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAllUserRequest {
    /// Case-insensitive substring matched against name and email.
    #[prost(string, tag = "1")]
    pub search: String,
    #[prost(bool, tag = "2")]
    pub is_active: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAllUserResponse {
    #[prost(message, repeated, tag = "1")]
    pub users: Vec<UserRecord>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetUserByIdRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

/// A user as returned to administrators. Timestamps are Unix seconds,
/// `deleted_at` is 0 for live accounts.
#[derive(Clone, PartialEq, prost::Message)]
pub struct UserRecord {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(int32, tag = "4")]
    pub role: i32,
    #[prost(bool, tag = "5")]
    pub is_active: bool,
    #[prost(string, tag = "6")]
    pub note: String,
    #[prost(int64, tag = "7")]
    pub created_at: i64,
    #[prost(int64, tag = "8")]
    pub updated_at: i64,
    #[prost(int64, tag = "9")]
    pub deleted_at: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateUserRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bool, tag = "3")]
    pub is_active: bool,
    #[prost(string, tag = "4")]
    pub note: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteUserRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

/// The caller's own account.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ProfileRecord {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(int64, tag = "4")]
    pub created_at: i64,
    #[prost(int64, tag = "5")]
    pub updated_at: i64,
    #[prost(int64, tag = "6")]
    pub deleted_at: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct ChangePasswordRequest {
    #[prost(string, tag = "1")]
    pub old_password: String,
    #[prost(string, tag = "2")]
    pub new_password: String,
}

impl fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePasswordRequest")
            .field("old_password", &REDACTED)
            .field("new_password", &REDACTED)
            .finish()
    }
}
