//! gRPC surface: handlers, access policy and the request gate.

pub mod auth_service;
pub mod policy;
pub mod request_gate;
