//! # AuthGate Core
//!
//! Session and request logic - no concrete HTTP stack.
//!
//! This crate contains:
//! - The observable session store
//! - Error classification for failed API responses
//! - The single-flight token refresh coordinator
//! - The authenticated request executor (refresh-then-retry-once)
//! - Session workflows built on top (sign-in, sign-out, bootstrap, identity
//!   sync)
//!
//! ## Architecture Principles
//! - Only depends on `authgate-domain`
//! - All network access goes through the [`Transport`] port
//! - Pure, testable logic over injected collaborators

pub mod api;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use api::classifier::{ErrorClassifier, FailureClass};
pub use api::errors::{ApiError, ApiErrorCategory};
pub use api::executor::{ApiExecutor, ExecutorConfig};
pub use api::ports::{Transport, TransportRequest, TransportResponse};
pub use api::refresh::RefreshCoordinator;
pub use api::request::ApiRequest;
pub use session::service::{SessionPaths, SessionService};
pub use session::store::{SessionStore, Subscription};
