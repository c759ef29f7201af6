//! API-specific error types
//!
//! Everything the request executor can hand back to a caller, with a coarse
//! category callers can use for their own retry or display decisions.

use authgate_domain::{ApiErrorBody, TransportError};
use thiserror::Error;

const NOT_JSON_MESSAGE: &str = "response is not JSON";

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401/403 that survived the executor's refresh-and-retry
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Other non-success statuses and unusable requests
    Client,
    /// No response was received
    Network,
    /// A success response the client could not interpret
    Protocol,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP status
    #[error("{message}")]
    Status { status: u16, message: String, body: Option<ApiErrorBody> },

    /// Success status without a JSON body
    #[error("response is not JSON (HTTP {status})")]
    NotJson { status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid request: {0}")]
    Encode(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build the error for a non-success response.
    ///
    /// The message is the server's message when it sent a non-blank one,
    /// otherwise `HTTP <status>`.
    pub fn from_status(status: u16, body: Option<ApiErrorBody>) -> Self {
        let message = body
            .as_ref()
            .and_then(ApiErrorBody::display_message)
            .map_or_else(|| format!("HTTP {status}"), str::to_owned);
        Self::Status { status, message, body }
    }

    /// HTTP status, when a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::NotJson { status } => Some(*status),
            Self::Transport(_) | Self::Encode(_) | Self::Decode(_) => None,
        }
    }

    /// User-facing message
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::NotJson { .. } => NOT_JSON_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Structured body sent by the server, if any
    pub fn body(&self) -> Option<&ApiErrorBody> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Domain error code from the body
    pub fn code(&self) -> Option<i64> {
        self.body().and_then(ApiErrorBody::code)
    }

    /// Server request id for support tickets
    pub fn request_id(&self) -> Option<&str> {
        self.body().and_then(|body| body.request_id.as_deref())
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Status { status: 401 | 403, .. } => ApiErrorCategory::Authentication,
            Self::Status { status: 429, .. } => ApiErrorCategory::RateLimit,
            Self::Status { status, .. } if *status >= 500 => ApiErrorCategory::Server,
            Self::Status { .. } | Self::Encode(_) => ApiErrorCategory::Client,
            Self::Transport(_) => ApiErrorCategory::Network,
            Self::NotJson { .. } | Self::Decode(_) => ApiErrorCategory::Protocol,
        }
    }

    /// Whether a caller may reasonably try the same request again later.
    ///
    /// Authentication failures are excluded: the executor already refreshed
    /// and retried once before surfacing them.
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }

    /// Get suggested retry delay in seconds
    pub fn retry_delay_secs(&self) -> u64 {
        match self.category() {
            ApiErrorCategory::RateLimit => 60,
            ApiErrorCategory::Server => 10,
            ApiErrorCategory::Network => 5,
            ApiErrorCategory::Authentication
            | ApiErrorCategory::Client
            | ApiErrorCategory::Protocol => 0,
        }
    }
}
