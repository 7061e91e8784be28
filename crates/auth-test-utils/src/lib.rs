//! # Auth Test Utilities
//!
//! Shared test utilities for the auth service.
//!
//! This crate provides:
//! - In-memory session store with clock and failure injection
//! - In-memory user repository
//! - Fixtures (token settings, config variables, user builder)
//! - Wired service bundle and an in-process gRPC server harness
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let users = MockUserRepository::new()
//!         .with_user(TestUserBuilder::new().role(Role::Admin).build());
//!     let server = TestAuthServer::spawn(MockSessionStore::new(), users).await?;
//!     let mut client = server.client().await?;
//! }
//! ```

pub mod fixtures;
pub mod mock_session_store;
pub mod mock_user_repository;
pub mod server_harness;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_session_store::*;
pub use mock_user_repository::*;
pub use server_harness::*;
