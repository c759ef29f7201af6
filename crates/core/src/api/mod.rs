//! Authenticated API access
//!
//! ```text
//! caller ──► ApiExecutor ──► Transport
//!                 │ 401
//!                 ├──► ErrorClassifier
//!                 ├──► RefreshCoordinator ──► SessionStore::login
//!                 └──► retry once / SessionStore::logout_if_token
//! ```

pub mod classifier;
pub mod errors;
pub mod executor;
pub mod ports;
pub mod refresh;
pub mod request;
