//! Port interfaces for HTTP access
//!
//! The core never talks to a network stack directly. Infrastructure provides
//! a [`Transport`]; tests provide scripted ones.

use async_trait::async_trait;
use authgate_domain::TransportError;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Fully resolved outgoing request
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Raw response as received from the server
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Vec::new() }
    }

    /// Response carrying a JSON document.
    pub fn with_json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status);
        response.headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        response.body = value.to_string().into_bytes();
        response
    }

    /// Response carrying an arbitrary body.
    pub fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        let mut response = Self::new(status);
        response.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response.body = body.into();
        response
    }

    /// Whether the `Content-Type` header announces JSON.
    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains(JSON_MEDIA_TYPE))
    }

    /// Body parsed as JSON, or `None` when the response is not announced as
    /// JSON or does not parse.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.json_as()
    }

    /// Body deserialized into `T` under the same rules as [`Self::json`].
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<T> {
        if !self.is_json() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

/// Capability to exchange one HTTP request for one response.
///
/// Implementations must not interpret status codes: any response the server
/// produced is `Ok`. `Err` is reserved for failures to get a response at all.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the complete response
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
