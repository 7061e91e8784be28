//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for signing secrets, passwords and
//! bearer credentials. `SecretString` implements `Debug` with redaction, so a
//! struct deriving `Debug` that holds one cannot leak it through `{:?}` or
//! tracing fields.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct LoginAttempt {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let attempt = LoginAttempt {
//!     email: "a@x.com".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! // Safe: password is redacted
//! println!("{:?}", attempt);
//!
//! let password: &str = attempt.password.expose_secret();
//! ```
//!
//! Use `SecretString` for:
//! - User passwords
//! - Access and refresh token signing secrets
//! - Bearer credentials held longer than a single function call

pub use secrecy::{ExposeSecret, SecretString};
