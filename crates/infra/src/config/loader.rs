//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory (or a parent) is applied first
//! 2. Then attempts to load from environment variables
//! 3. If `AUTHGATE_BASE_URL` is missing, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `AUTHGATE_BASE_URL`: API origin (required)
//! - `AUTHGATE_API_PREFIX`: Prefix for relative request paths
//! - `AUTHGATE_REFRESH_PATH`: Token refresh endpoint
//! - `AUTHGATE_TOKEN_INVALID_CODE`: Error code meaning "credential invalid"
//! - `AUTHGATE_HTTP_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `AUTHGATE_HTTP_MAX_ATTEMPTS`: Transport attempts per request
//! - `AUTHGATE_USER_AGENT`: User agent sent with every request
//! - `AUTHGATE_LOG_FILTER`: Tracing filter directive
//! - `AUTHGATE_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./authgate.json` or `./authgate.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use authgate_domain::{AuthGateError, ClientConfig, Result};

const BASE_URL_VAR: &str = "AUTHGATE_BASE_URL";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after applying any
/// `.env` file). If the base URL is missing, falls back to loading from a
/// config file.
///
/// # Errors
/// Returns `AuthGateError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<ClientConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Applied .env file");
    }

    if env_opt(BASE_URL_VAR).is_none() {
        tracing::debug!(var = BASE_URL_VAR, "Base URL not set, trying config file");
        return load_from_file(None);
    }

    let config = load_from_env()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `AUTHGATE_BASE_URL` is required; every other variable overrides a
/// default.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `AuthGateError::Config` if the base URL is missing or a value is
/// invalid.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::new(env_var(BASE_URL_VAR)?);

    if let Some(prefix) = env_opt("AUTHGATE_API_PREFIX") {
        config.api_prefix = prefix;
    }
    if let Some(path) = env_opt("AUTHGATE_REFRESH_PATH") {
        config.refresh_path = path;
    }
    if let Some(code) = env_parse::<i64>("AUTHGATE_TOKEN_INVALID_CODE", "token invalid code")? {
        config.token_invalid_code = code;
    }
    if let Some(timeout) = env_parse::<u64>("AUTHGATE_HTTP_TIMEOUT_SECS", "HTTP timeout")? {
        config.http.timeout_secs = timeout;
    }
    if let Some(attempts) = env_parse::<usize>("AUTHGATE_HTTP_MAX_ATTEMPTS", "HTTP max attempts")? {
        config.http.max_attempts = attempts;
    }
    if let Some(agent) = env_opt("AUTHGATE_USER_AGENT") {
        config.http.user_agent = Some(agent);
    }
    if let Some(filter) = env_opt("AUTHGATE_LOG_FILTER") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("AUTHGATE_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `AuthGateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthGateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthGateError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthGateError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthGateError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthGateError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AuthGateError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./authgate.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("authgate.json"),
        dir.join("authgate.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `AuthGateError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        AuthGateError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; blank values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| AuthGateError::Config(format!("Invalid {what} in {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
