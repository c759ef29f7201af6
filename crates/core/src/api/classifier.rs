//! Classification of failed responses
//!
//! Decides whether a non-success response is something the executor can
//! recover from by refreshing the session, and whether a failed recovery
//! should end the session.

use authgate_domain::constants::TOKEN_INVALID_ERROR_CODE;
use authgate_domain::ApiErrorBody;
use http::StatusCode;

/// Outcome of classifying a failed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Surface to the caller unchanged
    Fatal,
    /// Credential rejected; refresh and retry once
    Recoverable {
        /// End the session if recovery does not succeed
        logout_on_failure: bool,
    },
}

impl FailureClass {
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }
}

/// Stateless classifier keyed on the "token invalid" sentinel code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassifier {
    token_invalid_code: i64,
}

impl ErrorClassifier {
    pub const fn new(token_invalid_code: i64) -> Self {
        Self { token_invalid_code }
    }

    pub const fn token_invalid_code(&self) -> i64 {
        self.token_invalid_code
    }

    /// Classify a failed response.
    ///
    /// Only a 401 is recoverable, and never one returned by the refresh
    /// endpoint itself.
    pub fn classify(
        &self,
        status: StatusCode,
        body: Option<&ApiErrorBody>,
        from_refresh_endpoint: bool,
    ) -> FailureClass {
        if status != StatusCode::UNAUTHORIZED || from_refresh_endpoint {
            return FailureClass::Fatal;
        }

        FailureClass::Recoverable { logout_on_failure: self.should_force_logout(body) }
    }

    /// A 401 carrying any other numeric code (e.g. "current password
    /// incorrect") must not end the session. Without a numeric code the
    /// session is ended.
    pub fn should_force_logout(&self, body: Option<&ApiErrorBody>) -> bool {
        body.and_then(|b| b.code_equals(self.token_invalid_code)).unwrap_or(true)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(TOKEN_INVALID_ERROR_CODE)
    }
}
