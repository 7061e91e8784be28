//! Log field hygiene for the auth service.
//!
//! Instrumented functions use `#[instrument(skip_all)]` and record fields
//! explicitly. Fields fall into three groups:
//! - **SAFE**: plaintext (roles, credential kinds, operation paths)
//! - **HASHED**: SHA-256 prefix for correlation (user ids, emails)
//! - **NEVER**: passwords, bearer credentials, signing secrets

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// One-way, truncated, and not suitable for protecting secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    // First 4 bytes (32 bits) is enough to correlate entries
    hex::encode(result.get(..4).unwrap_or_default())
}
