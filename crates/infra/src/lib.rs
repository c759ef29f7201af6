//! # AuthGate Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport (with cookie store)
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//! - The composition root wiring store, refresh coordinator, executor and
//!   session service together
//!
//! ## Architecture
//! - Implements traits defined in `authgate-core`
//! - Depends on `authgate-domain` and `authgate-core`
//! - Contains all "impure" code (network, environment, filesystem)

pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use context::ClientContext;
pub use errors::InfraError;
pub use self::http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
