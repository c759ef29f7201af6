//! Domain types and models

pub mod api;
pub mod session;
pub mod user;

// Re-export for convenience
pub use api::{ApiErrorBody, Credentials, SessionTokenResponse};
pub use session::{AccessToken, AuthRole, LogoutReason, Notification, SessionState};
pub use user::{AuthUser, CurrentUserProfile, PermissionSet};
