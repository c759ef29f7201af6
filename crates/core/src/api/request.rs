//! Caller-facing request description

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use super::errors::ApiError;

/// A request as the caller describes it, before URL resolution and
/// credential attachment.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    anonymous: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: HeaderMap::new(), body: None, anonymous: false }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header. Caller headers are kept on both the first attempt and
    /// the retry; `Authorization` is always replaced by the executor.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `payload` as the JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::Encode` if `payload` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Raw body; set a `Content-Type` header alongside it.
    #[must_use]
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(bytes.into());
        self
    }

    /// Send without the session credential, as for sign-in. A 401 on an
    /// anonymous request is never recovered.
    #[must_use]
    pub fn without_credentials(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}
