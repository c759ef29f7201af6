//! Wire shapes shared with the server
//!
//! Business payloads stay opaque JSON. Only the error envelope and the
//! session token responses are modelled here.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Error envelope carried by non-success JSON responses.
///
/// Every field is optional and tolerant: a `code` that is not a number or a
/// `message` that is not a string is treated as absent instead of failing
/// the whole body. Any JSON number counts as a code, including `1002.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "lenient_number")]
    pub code: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Interpret an already parsed JSON document as an error envelope.
    ///
    /// Returns `None` for anything that is not a JSON object.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Body with a numeric `code` and nothing else.
    pub fn with_code(code: impl Into<serde_json::Number>) -> Self {
        Self { code: Some(code.into()), ..Self::default() }
    }

    /// Integral value of `code` (`1002.0` reads as `1002`).
    ///
    /// `None` when absent, fractional or outside the `i64` range.
    pub fn code(&self) -> Option<i64> {
        let code = self.code.as_ref()?;
        code.as_i64().or_else(|| {
            let value = code.as_f64()?;
            // Integral and exactly representable, so the cast is lossless.
            (value.fract() == 0.0 && value.abs() < 9.0e15).then(|| value as i64)
        })
    }

    /// Compare `code` numerically against `expected`.
    ///
    /// `None` when the body carries no numeric code at all.
    pub fn code_equals(&self, expected: i64) -> Option<bool> {
        let code = self.code.as_ref()?;
        Some(match code.as_i64() {
            Some(value) => value == expected,
            None => code.as_f64().is_some_and(|value| value == expected as f64),
        })
    }

    /// Human readable message, ignoring blank strings.
    pub fn display_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<serde_json::Number>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => Some(number),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_owned)))
}

/// Body returned by sign-in and by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokenResponse {
    pub token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Sign-in request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
