//! Common utilities and types shared across the auth service crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for bearer credential utilities (size limits, header parsing)
pub mod jwt;
