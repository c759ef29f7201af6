//! Client configuration

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_API_PREFIX, DEFAULT_CURRENT_SESSION_PATH, DEFAULT_CURRENT_USER_PATH,
    DEFAULT_HTTP_BACKOFF_MS, DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_LOG_FILTER, DEFAULT_REFRESH_PATH, DEFAULT_SESSIONS_PATH, TOKEN_INVALID_ERROR_CODE,
};
use crate::errors::{AuthGateError, Result};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin the API is served from (e.g. `https://app.example.com`)
    pub base_url: String,
    /// Prefix joined onto relative request paths
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_sessions_path")]
    pub sessions_path: String,
    #[serde(default = "default_current_session_path")]
    pub current_session_path: String,
    #[serde(default = "default_current_user_path")]
    pub current_user_path: String,
    /// Error code meaning "credential invalid or expired"
    #[serde(default = "default_token_invalid_code")]
    pub token_invalid_code: i64,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request (1 = no transport retries)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl ClientConfig {
    /// Configuration with every default applied for the given origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: default_api_prefix(),
            refresh_path: default_refresh_path(),
            sessions_path: default_sessions_path(),
            current_session_path: default_current_session_path(),
            current_user_path: default_current_user_path(),
            token_invalid_code: default_token_invalid_code(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parsed `base_url`.
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` if the URL is not absolute.
    pub fn base(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            AuthGateError::Config(format!("Invalid base_url '{}': {}", self.base_url, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(AuthGateError::Config(format!(
                "base_url '{}' cannot be used as a base",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Check the configuration for values the client cannot work with.
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.base()?;

        let paths = [
            ("api_prefix", &self.api_prefix),
            ("refresh_path", &self.refresh_path),
            ("sessions_path", &self.sessions_path),
            ("current_session_path", &self.current_session_path),
            ("current_user_path", &self.current_user_path),
        ];
        for (name, path) in paths {
            if !path.starts_with('/') {
                return Err(AuthGateError::Config(format!(
                    "{name} must start with '/', got '{path}'"
                )));
            }
        }

        if self.http.timeout_secs == 0 {
            return Err(AuthGateError::Config("http.timeout_secs must be positive".into()));
        }
        if self.http.max_attempts == 0 {
            return Err(AuthGateError::Config("http.max_attempts must be at least 1".into()));
        }

        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_backoff_ms(),
            user_agent: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter(), json: false }
    }
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_sessions_path() -> String {
    DEFAULT_SESSIONS_PATH.to_string()
}

fn default_current_session_path() -> String {
    DEFAULT_CURRENT_SESSION_PATH.to_string()
}

fn default_current_user_path() -> String {
    DEFAULT_CURRENT_USER_PATH.to_string()
}

const fn default_token_invalid_code() -> i64 {
    TOKEN_INVALID_ERROR_CODE
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_max_attempts() -> usize {
    DEFAULT_HTTP_MAX_ATTEMPTS
}

const fn default_backoff_ms() -> u64 {
    DEFAULT_HTTP_BACKOFF_MS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
