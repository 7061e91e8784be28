//! Auth Service Library
//!
//! Credential issuance, verification and revocation for a gRPC auth
//! service, plus user administration.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Credential signing and password hashing
//! - `errors` - Error types and their gRPC status mapping
//! - `grpc` - Handlers, per-operation policy and the request gate
//! - `models` - Data models
//! - `repositories` - User store
//! - `services` - Business logic layer
//! - `store` - Session store holding live credentials

pub mod config;
pub mod crypto;
pub mod errors;
pub mod grpc;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;
pub mod store;
