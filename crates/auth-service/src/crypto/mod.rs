use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AuthError;
use crate::models::RequestClaims;
use common::jwt::check_token_size;
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::instrument;

/// Unauthenticated message for a credential signed with another algorithm.
pub const UNEXPECTED_SIGNING_METHOD: &str = "unexpected signing method";

/// Unauthenticated message for any other signature or decode failure.
pub const INVALID_TOKEN: &str = "invalid token";

/// Precomputed bcrypt hash compared against when the email is unknown, so
/// the response time does not reveal whether an account exists.
pub const DUMMY_PASSWORD_HASH: &str =
    "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewY5GyYqExt7YD3a";

/// Sign claims with HMAC-SHA256.
#[instrument(skip_all)]
pub fn sign_claims(claims: &RequestClaims, secret: &SecretString) -> Result<String, AuthError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());

    let encoding_key = EncodingKey::from_secret(secret.expose_secret().as_bytes());

    encode(&header, claims, &encoding_key)
        .map_err(|e| AuthError::Crypto(format!("JWT signing operation failed: {}", e)))
}

/// Verify an HS256 signature and decode the claims.
///
/// Expiry is NOT checked here; callers compare `exp` against their own
/// clock so verification stays a function of its inputs.
///
/// # Errors
///
/// - `Unauthenticated("unexpected signing method")` for any algorithm other
///   than HS256
/// - `Unauthenticated("invalid token")` for oversized, malformed or
///   tampered tokens, bad signatures, and unknown role values
#[instrument(skip_all)]
pub fn verify_signature(token: &str, secret: &SecretString) -> Result<RequestClaims, AuthError> {
    // Size check runs before any base64 or HMAC work
    if check_token_size(token).is_err() {
        return Err(AuthError::unauthenticated(INVALID_TOKEN));
    }

    let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;

    let token_data = decode::<RequestClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "auth.crypto", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::InvalidAlgorithm => AuthError::unauthenticated(UNEXPECTED_SIGNING_METHOD),
            _ => AuthError::unauthenticated(INVALID_TOKEN),
        }
    })?;

    Ok(token_data.claims)
}

/// Hash a password with bcrypt using the configured cost factor.
///
/// # Errors
///
/// Returns `AuthError::Crypto` if the cost is outside 10-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AuthError::Crypto(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| AuthError::Crypto(format!("Password hashing failed: {}", e)))
}

/// Compare a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash)
        .map_err(|e| AuthError::Crypto(format!("Password verification failed: {}", e)))
}
