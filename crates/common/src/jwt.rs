//! Bearer credential utilities shared across the auth service crates.
//!
//! - Size limit applied before any parsing or signature work
//! - Strict `authorization` header parsing (`Bearer <token>`)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The scheme is case-sensitive and the header must contain exactly two
//!   space-separated parts
//! - Error messages are terse and never echo the header value

use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed credential size in bytes (8KB).
///
/// Typical access credentials are 250-400 bytes. Anything past this limit is
/// rejected before base64 decoding or HMAC computation.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Metadata key carrying the bearer credential.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// The only accepted authorization scheme.
pub const BEARER_SCHEME: &str = "Bearer";

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced while parsing an `authorization` header value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BearerError {
    /// No `authorization` value was supplied.
    #[error("authorization token is not provided")]
    Missing,

    /// The value is not `Bearer <token>`.
    #[error("invalid access token format")]
    InvalidFormat,

    /// The token exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("invalid access token format")]
    TooLarge,
}

// =============================================================================
// Functions
// =============================================================================

/// Parse an `authorization` header value into its bearer token.
///
/// Accepts exactly `"Bearer <token>"`: two parts separated by a single
/// space, the literal scheme `Bearer`, and a non-empty token.
///
/// # Errors
///
/// - `Missing` - `value` is `None`
/// - `InvalidFormat` - wrong scheme, wrong number of parts, or empty token
/// - `TooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
///
/// # Example
///
/// ```rust
/// use common::jwt::{parse_bearer, BearerError};
///
/// assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
/// assert_eq!(parse_bearer(Some("bearer abc")), Err(BearerError::InvalidFormat));
/// assert_eq!(parse_bearer(None), Err(BearerError::Missing));
/// ```
pub fn parse_bearer(value: Option<&str>) -> Result<&str, BearerError> {
    let value = value.ok_or(BearerError::Missing)?;

    let mut parts = value.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        tracing::debug!(target: "common.jwt", "Authorization header has wrong part count");
        return Err(BearerError::InvalidFormat);
    };

    if scheme != BEARER_SCHEME || token.is_empty() {
        tracing::debug!(target: "common.jwt", "Authorization header has wrong scheme or empty token");
        return Err(BearerError::InvalidFormat);
    }

    check_token_size(token)?;

    Ok(token)
}

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `BearerError::TooLarge` when the token is over the limit.
pub fn check_token_size(token: &str) -> Result<(), BearerError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(BearerError::TooLarge);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
