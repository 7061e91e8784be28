//! Auth service configuration.
//!
//! Loaded from environment variables. Signing secrets and the database URL
//! are redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default gRPC bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:50051";

/// Default access credential lifetime in hours.
pub const DEFAULT_ACCESS_TOKEN_EXPIRY_HOURS: u64 = 1;

/// Default refresh credential lifetime in hours (one week).
pub const DEFAULT_REFRESH_TOKEN_EXPIRY_HOURS: u64 = 168;

/// Longest accepted credential lifetime in hours (one year).
pub const MAX_TOKEN_EXPIRY_HOURS: u64 = 8760;

const SECONDS_PER_HOUR: u64 = 3600;

/// Default session store host and port.
pub const DEFAULT_CACHE_HOST: &str = "127.0.0.1";
pub const DEFAULT_CACHE_PORT: u16 = 6379;

/// Default per-call timeout for store and database calls, in seconds.
pub const DEFAULT_CONTEXT_TIMEOUT_SECONDS: u64 = 10;

/// Maximum per-call timeout in seconds.
pub const MAX_CONTEXT_TIMEOUT_SECONDS: u64 = 300;

/// Minimum length of a signing secret in bytes (256 bits for HS256).
pub const MIN_SECRET_BYTES: usize = 32;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum allowed bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum allowed bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Auth service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL for the user store.
    pub database_url: String,

    /// gRPC bind address (default: "0.0.0.0:50051").
    pub bind_address: String,

    /// HMAC secret for access credentials.
    pub access_token_secret: SecretString,

    /// HMAC secret for refresh credentials. Must differ from the access secret.
    pub refresh_token_secret: SecretString,

    /// Access credential lifetime.
    pub access_token_ttl: Duration,

    /// Refresh credential lifetime.
    pub refresh_token_ttl: Duration,

    /// Session store (Redis) host.
    pub cache_host: String,

    /// Session store (Redis) port.
    pub cache_port: u16,

    /// Upper bound for every store and user-store call.
    pub context_timeout: Duration,

    /// Bcrypt cost factor for new password hashes (10-14).
    pub bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("access_token_secret", &"[REDACTED]")
            .field("refresh_token_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cache_host", &self.cache_host)
            .field("cache_port", &self.cache_port)
            .field("context_timeout", &self.context_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid token expiry configuration: {0}")]
    InvalidTokenExpiry(String),

    #[error("Invalid cache configuration: {0}")]
    InvalidCache(String),

    #[error("Invalid context timeout configuration: {0}")]
    InvalidContextTimeout(String),

    #[error("Invalid bcrypt cost configuration: {0}")]
    InvalidBcryptCost(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let access_token_secret = required_secret(vars, "ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required_secret(vars, "REFRESH_TOKEN_SECRET")?;

        // A shared secret would let a refresh credential verify as an access credential
        if access_token_secret.expose_secret() == refresh_token_secret.expose_secret() {
            return Err(ConfigError::InvalidSecret(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string(),
            ));
        }

        let access_hours = parse_expiry_hours(
            vars,
            "ACCESS_TOKEN_EXPIRY_HOUR",
            DEFAULT_ACCESS_TOKEN_EXPIRY_HOURS,
        )?;
        let refresh_hours = parse_expiry_hours(
            vars,
            "REFRESH_TOKEN_EXPIRY_HOUR",
            DEFAULT_REFRESH_TOKEN_EXPIRY_HOURS,
        )?;

        if refresh_hours < access_hours {
            return Err(ConfigError::InvalidTokenExpiry(format!(
                "REFRESH_TOKEN_EXPIRY_HOUR ({}) must not be shorter than ACCESS_TOKEN_EXPIRY_HOUR ({})",
                refresh_hours, access_hours
            )));
        }

        let cache_host = vars
            .get("CACHE_HOST")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CACHE_HOST.to_string());

        let cache_port = if let Some(value_str) = vars.get("CACHE_PORT") {
            let value: u16 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCache(format!(
                    "CACHE_PORT must be a valid port number, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidCache(
                    "CACHE_PORT must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_CACHE_PORT
        };

        let context_timeout_seconds = if let Some(value_str) = vars.get("CONTEXT_TIMEOUT") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidContextTimeout(format!(
                    "CONTEXT_TIMEOUT must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_CONTEXT_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidContextTimeout(format!(
                    "CONTEXT_TIMEOUT must be between 1 and {} seconds, got {}",
                    MAX_CONTEXT_TIMEOUT_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_CONTEXT_TIMEOUT_SECONDS
        };

        let bcrypt_cost = if let Some(value_str) = vars.get("BCRYPT_COST") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&value) {
                return Err(ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, value
                )));
            }

            value
        } else {
            DEFAULT_BCRYPT_COST
        };

        Ok(Config {
            database_url,
            bind_address,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl: expiry_duration("ACCESS_TOKEN_EXPIRY_HOUR", access_hours)?,
            refresh_token_ttl: expiry_duration("REFRESH_TOKEN_EXPIRY_HOUR", refresh_hours)?,
            cache_host,
            cache_port,
            context_timeout: Duration::from_secs(context_timeout_seconds),
            bcrypt_cost,
        })
    }

    /// Connection URL for the session store.
    pub fn cache_url(&self) -> String {
        format!("redis://{}:{}/", self.cache_host, self.cache_port)
    }
}

fn required_secret(vars: &HashMap<String, String>, name: &str) -> Result<SecretString, ConfigError> {
    let value = vars
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if value.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::InvalidSecret(format!(
            "{} must be at least {} bytes, got {}",
            name,
            MIN_SECRET_BYTES,
            value.len()
        )));
    }

    Ok(SecretString::from(value.as_str()))
}

fn parse_expiry_hours(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidTokenExpiry(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidTokenExpiry(format!(
            "{} must be greater than 0",
            name
        )));
    }

    if value > MAX_TOKEN_EXPIRY_HOURS {
        return Err(ConfigError::InvalidTokenExpiry(format!(
            "{} must be at most {} hours, got {}",
            name, MAX_TOKEN_EXPIRY_HOURS, value
        )));
    }

    Ok(value)
}

fn expiry_duration(name: &str, hours: u64) -> Result<Duration, ConfigError> {
    hours
        .checked_mul(SECONDS_PER_HOUR)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::InvalidTokenExpiry(format!("{} of {} hours overflows", name, hours))
        })
}
