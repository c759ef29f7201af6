//! Client constants
//!
//! Centralized location for the well-known paths, error codes and defaults
//! shared by every layer.

// Server error codes (carried in the `code` field of error bodies)
pub const TOKEN_INVALID_ERROR_CODE: i64 = 1001;
pub const CREDENTIAL_ERROR_CODE: i64 = 1002;

// Well-known endpoints
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/sessions/refresh";
pub const DEFAULT_SESSIONS_PATH: &str = "/api/v1/sessions";
pub const DEFAULT_CURRENT_SESSION_PATH: &str = "/api/v1/sessions/current";
pub const DEFAULT_CURRENT_USER_PATH: &str = "/api/v1/users/me";

// Flash shown after a forced logout
pub const SESSION_EXPIRED_TITLE: &str = "Session expired";
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Your token has expired or is invalid. Please sign in again.";

// Transport defaults
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 1;
pub const DEFAULT_HTTP_BACKOFF_MS: u64 = 200;

// Logging defaults
pub const DEFAULT_LOG_FILTER: &str = "info";

// Permission wildcards
pub const PERMISSION_WILDCARD: &str = "*";
pub const PERMISSION_NAMESPACE_SEPARATOR: char = ':';
