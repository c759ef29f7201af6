//! # AuthGate Domain
//!
//! Session and API data types for AuthGate.
//!
//! This crate contains:
//! - Session state, access tokens and flash notifications
//! - Identity and permission types synced from the current-user endpoint
//! - API error bodies and session token responses
//! - Client configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other AuthGate crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
