//! Authenticated request executor
//!
//! Sends a request with the current credential attached. A recoverable 401
//! on an authenticated request triggers one token refresh and exactly one
//! retry; if recovery fails the session may be ended as expired. Every other
//! failure reaches the caller unchanged.

use std::sync::Arc;

use authgate_domain::{AccessToken, ApiErrorBody, ClientConfig, LogoutReason};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::classifier::{ErrorClassifier, FailureClass};
use super::errors::ApiError;
use super::ports::{Transport, TransportRequest, TransportResponse};
use super::refresh::RefreshCoordinator;
use super::request::ApiRequest;
use crate::session::store::SessionStore;

fn json_media_type() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Where requests go and how failures are classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub base_url: Url,
    /// Prefix joined onto relative paths (no trailing slash)
    pub api_prefix: String,
    pub refresh_path: String,
    pub token_invalid_code: i64,
}

impl ExecutorConfig {
    /// Derive executor settings from a validated client configuration.
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` if `config` does not validate.
    pub fn from_client_config(config: &ClientConfig) -> authgate_domain::Result<Self> {
        config.validate()?;
        Ok(Self {
            base_url: config.base()?,
            api_prefix: config.api_prefix.trim_end_matches('/').to_string(),
            refresh_path: config.refresh_path.clone(),
            token_invalid_code: config.token_invalid_code,
        })
    }

    /// Absolute URL of the refresh endpoint
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` if the path cannot be joined.
    pub fn refresh_url(&self) -> authgate_domain::Result<Url> {
        self.base_url.join(&self.refresh_path).map_err(|e| {
            authgate_domain::AuthGateError::Config(format!(
                "Invalid refresh_path '{}': {}",
                self.refresh_path, e
            ))
        })
    }

    /// First segment of the prefix (`/api/` for `/api/v1`). Paths already
    /// under it are sent as given.
    fn api_root(&self) -> Option<String> {
        self.api_prefix
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("/{segment}/"))
    }
}

/// Executes API requests on behalf of the current session
pub struct ApiExecutor {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    refresh: RefreshCoordinator,
    classifier: ErrorClassifier,
    config: ExecutorConfig,
}

impl ApiExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
        refresh: RefreshCoordinator,
        config: ExecutorConfig,
    ) -> Self {
        let classifier = ErrorClassifier::new(config.token_invalid_code);
        Self { transport, session, refresh, classifier, config }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Resolve a caller path to an absolute URL.
    ///
    /// Absolute `http(s)` URLs pass through (and are sent without the
    /// session credential unless they share the API origin). Paths under the
    /// API root are used verbatim; anything else is joined onto the API
    /// prefix.
    ///
    /// # Errors
    /// Returns `ApiError::Encode` if the result is not a valid URL.
    pub fn resolve_url(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::Encode(format!("{path}: {e}")));
        }

        let full = match self.config.api_root() {
            Some(root) if path.starts_with(&root) => path.to_string(),
            _ => format!("{}/{}", self.config.api_prefix, path.trim_start_matches('/')),
        };
        self.config.base_url.join(&full).map_err(|e| ApiError::Encode(format!("{full}: {e}")))
    }

    /// The session credential is only ever sent to the configured origin.
    fn is_api_origin(&self, url: &Url) -> bool {
        url.origin() == self.config.base_url.origin()
    }

    fn is_refresh_endpoint(&self, url: &Url) -> bool {
        url.path().trim_end_matches('/') == self.config.refresh_path.trim_end_matches('/')
    }

    /// Execute `request`, refreshing and retrying once on a recoverable 401.
    ///
    /// Returns the parsed JSON body, or `None` for 204/205.
    ///
    /// # Errors
    /// - `ApiError::Status` for a non-success response that was not
    ///   recovered. After a failed recovery this is the original response,
    ///   not the retry's.
    /// - `ApiError::NotJson` for a success response without a JSON body.
    /// - `ApiError::Transport` when no response was received.
    pub async fn execute(&self, request: ApiRequest) -> Result<Option<Value>, ApiError> {
        self.execute_with_token(request).await.map(|(body, _)| body)
    }

    /// Like [`Self::execute`], also returning the credential the successful
    /// response was obtained with (`None` for anonymous requests).
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute_with_token(
        &self,
        request: ApiRequest,
    ) -> Result<(Option<Value>, Option<AccessToken>), ApiError> {
        let url = self.resolve_url(request.path())?;
        let credentialed = !request.is_anonymous() && self.is_api_origin(&url);
        let token_at_start = if credentialed { self.session.read() } else { None };

        let response = self.dispatch(&request, &url, token_at_start.as_ref()).await?;
        if response.status.is_success() {
            return read_success(&response).map(|body| (body, token_at_start));
        }

        let status = response.status;
        let body = response.json().as_ref().and_then(ApiErrorBody::from_json);
        let class = self.classifier.classify(status, body.as_ref(), self.is_refresh_endpoint(&url));
        let error = ApiError::from_status(status.as_u16(), body);

        let FailureClass::Recoverable { logout_on_failure } = class else {
            debug!(status = status.as_u16(), "request failed");
            return Err(error);
        };

        let Some(token_at_start) = token_at_start else {
            debug!("anonymous request rejected; nothing to refresh");
            return Err(error);
        };

        if let Some(token) = self.refresh.refresh().await {
            let retry = self.dispatch(&request, &url, Some(&token)).await?;
            if retry.status.is_success() {
                debug!(status = retry.status.as_u16(), "request succeeded after token refresh");
                return read_success(&retry).map(|body| (body, Some(token)));
            }
            warn!(status = retry.status.as_u16(), "request still rejected after token refresh");
        }

        // Only the caller whose starting token is still current logs out.
        if logout_on_failure {
            let expired = self.session.logout_if_token(&token_at_start, LogoutReason::Expired);
            if expired {
                warn!(status = status.as_u16(), code = ?error.code(), "session expired");
            }
        }

        Err(error)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        url: &Url,
        token: Option<&AccessToken>,
    ) -> Result<TransportResponse, ApiError> {
        let mut headers = request.headers().clone();
        headers.insert(ACCEPT, json_media_type());
        if request.payload().is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, json_media_type());
        }
        headers.remove(AUTHORIZATION);
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&token.bearer())
                .map_err(|_| ApiError::Encode("access token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let outgoing = TransportRequest {
            method: request.method().clone(),
            url: url.clone(),
            headers,
            body: request.payload().map(<[u8]>::to_vec),
        };

        let response = self.transport.send(outgoing).await?;
        debug!(
            status = response.status.as_u16(),
            authenticated = token.is_some(),
            "response received"
        );
        Ok(response)
    }

    /// Execute `request` and deserialize the body into `T`.
    ///
    /// A no-content response deserializes from JSON `null`, so `()` and
    /// `Option<_>` work for endpoints that return 204.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.execute(request).await?.unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }
}

impl std::fmt::Debug for ApiExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiExecutor")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

fn read_success(response: &TransportResponse) -> Result<Option<Value>, ApiError> {
    if matches!(response.status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
        return Ok(None);
    }
    response.json().map(Some).ok_or(ApiError::NotJson { status: response.status.as_u16() })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use authgate_domain::{Notification, SessionState, TransportError};
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::testing::ScriptedTransport;

    const REFRESH: &str = "/api/v1/sessions/refresh";
    const WIDGETS: &str = "/api/v1/widgets";

    struct Harness {
        transport: ScriptedTransport,
        session: Arc<SessionStore>,
        executor: Arc<ApiExecutor>,
    }

    fn token(raw: &str) -> AccessToken {
        AccessToken::new(raw).unwrap()
    }

    fn harness(initial: Option<&str>) -> Harness {
        let transport = ScriptedTransport::new();
        let session = Arc::new(match initial {
            Some(raw) => SessionStore::with_token(token(raw)),
            None => SessionStore::new(),
        });
        let config = ExecutorConfig::from_client_config(&ClientConfig::new("https://app.test"))
            .unwrap();
        let refresh = RefreshCoordinator::new(
            Arc::new(transport.clone()),
            Arc::clone(&session),
            config.refresh_url().unwrap(),
        );
        let executor = Arc::new(ApiExecutor::new(
            Arc::new(transport.clone()),
            Arc::clone(&session),
            refresh,
            config,
        ));
        Harness { transport, session, executor }
    }

    fn bearer(request: &TransportRequest) -> Option<&str> {
        request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    fn json_response(status: u16, value: Value) -> TransportResponse {
        TransportResponse::with_json(StatusCode::from_u16(status).unwrap(), &value)
    }

    /// Accepts only `valid`, otherwise 401 with `rejection`.
    fn guarded(transport: &ScriptedTransport, path: &str, valid: &'static str, rejection: Value) {
        transport.route(path, move |request| {
            let rejection = rejection.clone();
            let accepted = bearer(&request) == Some(valid);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if accepted {
                    Ok(json_response(200, json!({"ok": true})))
                } else {
                    Ok(json_response(401, rejection))
                }
            }
        });
    }

    fn refresh_yields(transport: &ScriptedTransport, raw: &'static str) {
        transport.route(REFRESH, move |_| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json_response(200, json!({"token": raw, "expires_in": 900})))
        });
    }

    fn refresh_rejected(transport: &ScriptedTransport) {
        transport.respond(REFRESH, json_response(401, json!({"code": 1001})));
    }

    fn record(session: &SessionStore) -> (Arc<Mutex<Vec<SessionState>>>, crate::Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = session.subscribe(move |state| sink.lock().push(state.clone()));
        (seen, sub)
    }

    fn logouts(states: &[SessionState]) -> usize {
        states.windows(2).filter(|w| w[0].is_authenticated() && !w[1].is_authenticated()).count()
    }

    #[test]
    fn resolves_paths_against_prefix() {
        let h = harness(None);
        let resolve = |path| h.executor.resolve_url(path).unwrap().to_string();

        assert_eq!(resolve("/widgets"), "https://app.test/api/v1/widgets");
        assert_eq!(resolve("widgets?page=2"), "https://app.test/api/v1/widgets?page=2");
        assert_eq!(resolve("/api/v2/reports"), "https://app.test/api/v2/reports");
        assert_eq!(resolve("https://cdn.test/file.json"), "https://cdn.test/file.json");
    }

    #[tokio::test]
    async fn attaches_credentials_and_json_headers() {
        let h = harness(Some("t1"));
        h.transport.respond(WIDGETS, json_response(201, json!({"id": 3})));

        let body = h
            .executor
            .execute(ApiRequest::post("/widgets").json(&json!({"name": "gear"})).unwrap())
            .await
            .unwrap();

        assert_eq!(body, Some(json!({"id": 3})));
        let sent = &h.transport.requests_to(WIDGETS)[0];
        assert_eq!(bearer(sent), Some("t1"));
        assert!(sent.headers.get(AUTHORIZATION).unwrap().is_sensitive());
        assert_eq!(sent.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(sent.headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_credentials() {
        let h = harness(None);
        h.transport.respond(WIDGETS, json_response(200, json!([])));

        h.executor.execute(ApiRequest::get("/widgets")).await.unwrap();

        let sent = &h.transport.requests_to(WIDGETS)[0];
        assert!(sent.headers.get(AUTHORIZATION).is_none());
        assert!(sent.headers.get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn caller_content_type_is_kept() {
        let h = harness(None);
        h.transport.respond(WIDGETS, TransportResponse::new(StatusCode::NO_CONTENT));

        let request = ApiRequest::put("/widgets")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
            .body("a,b\n1,2\n");
        h.executor.execute(request).await.unwrap();

        let sent = &h.transport.requests_to(WIDGETS)[0];
        assert_eq!(sent.headers.get(CONTENT_TYPE).unwrap(), "text/csv");
    }

    #[tokio::test]
    async fn no_content_is_unit() {
        let h = harness(Some("t1"));
        h.transport.respond(
            WIDGETS,
            TransportResponse::with_body(StatusCode::NO_CONTENT, "text/plain", "ignored"),
        );

        assert_eq!(h.executor.execute(ApiRequest::delete("/widgets")).await.unwrap(), None);
        let () = h.executor.delete("/widgets").await.unwrap();
    }

    #[tokio::test]
    async fn non_json_success_is_protocol_error() {
        let h = harness(Some("t1"));
        h.transport.respond(WIDGETS, TransportResponse::with_body(StatusCode::OK, "text/html", "<p>"));

        let err = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotJson { status: 200 }));
        assert_eq!(err.message(), "response is not JSON");
    }

    #[tokio::test]
    async fn fatal_statuses_surface_without_refresh() {
        let h = harness(Some("t1"));
        h.transport.respond(
            WIDGETS,
            json_response(503, json!({"code": 5003, "message": "maintenance", "request_id": "r1"})),
        );

        let err = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.message(), "maintenance");
        assert_eq!(err.request_id(), Some("r1"));
        assert_eq!(h.transport.count(REFRESH), 0);
        assert_eq!(h.session.read(), Some(token("t1")));
    }

    #[tokio::test]
    async fn non_json_error_body_is_absent() {
        let h = harness(Some("t1"));
        h.transport.respond(
            WIDGETS,
            TransportResponse::with_body(StatusCode::BAD_GATEWAY, "text/html", "<h1>bad</h1>"),
        );

        let err = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();
        assert!(err.body().is_none());
        assert_eq!(err.message(), "HTTP 502");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let h = harness(Some("t1"));
        h.transport.route(WIDGETS, |_| async { Err(TransportError::Timeout("30s".into())) });

        let err = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Timeout(_))));
        assert_eq!(h.transport.count(WIDGETS), 1);
    }

    #[tokio::test]
    async fn anonymous_401_never_refreshes() {
        let h = harness(None);
        h.transport.respond(WIDGETS, json_response(401, json!({"code": 1001})));
        refresh_yields(&h.transport, "t2");

        let err = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.transport.count(REFRESH), 0);
        assert!(h.session.snapshot().flash().is_none());
    }

    #[tokio::test]
    async fn refreshes_and_retries_exactly_once() {
        let h = harness(Some("t1"));
        guarded(&h.transport, WIDGETS, "t2", json!({"code": 1001}));
        refresh_yields(&h.transport, "t2");

        let body = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap();

        assert_eq!(body, Some(json!({"ok": true})));
        assert_eq!(h.transport.bearers_to(WIDGETS), vec![Some("t1".into()), Some("t2".into())]);
        assert_eq!(h.transport.count(REFRESH), 1);
        assert_eq!(h.session.read(), Some(token("t2")));
    }

    #[tokio::test]
    async fn retry_failure_returns_original_error() {
        let h = harness(Some("t1"));
        h.transport.respond_sequence(
            WIDGETS,
            vec![
                json_response(401, json!({"code": 1001, "message": "token expired"})),
                json_response(401, json!({"code": 1001, "message": "still rejected"})),
            ],
        );
        refresh_yields(&h.transport, "t2");

        let err = h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();

        assert_eq!(err.message(), "token expired");
        assert_eq!(h.transport.count(WIDGETS), 2);
        // the refresh replaced t1, so the failure no longer applies to this session
        assert_eq!(h.session.read(), Some(token("t2")));
        assert!(h.session.snapshot().flash().is_none());
    }

    #[tokio::test]
    async fn other_known_code_never_logs_out() {
        let h = harness(Some("t1"));
        let path = "/api/v1/users/me/password";
        h.transport.respond(
            path,
            json_response(401, json!({"code": 1002, "message": "current password incorrect"})),
        );
        refresh_rejected(&h.transport);
        let (seen, _sub) = record(&h.session);

        let err = h
            .executor
            .execute(ApiRequest::put("/users/me/password").json(&json!({"old": "x"})).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(1002));
        assert_eq!(h.session.read(), Some(token("t1")));
        assert_eq!(logouts(&seen.lock()), 0);
    }

    #[tokio::test]
    async fn float_encoded_code_never_logs_out() {
        let h = harness(Some("t1"));
        let path = "/api/v1/users/me/password";
        h.transport.respond(
            path,
            json_response(401, json!({"code": 1002.0, "message": "current password incorrect"})),
        );
        refresh_rejected(&h.transport);

        let err = h.executor.execute(ApiRequest::put(path)).await.unwrap_err();

        assert_eq!(err.code(), Some(1002));
        assert_eq!(h.session.read(), Some(token("t1")));
        assert!(h.session.snapshot().flash().is_none());
    }

    #[tokio::test]
    async fn foreign_origins_never_see_the_credential() {
        let h = harness(Some("t1"));
        h.transport.respond("/file.json", json_response(401, json!({"code": 1001})));

        let err = h
            .executor
            .execute(ApiRequest::get("https://cdn.test/file.json"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.transport.bearers_to("/file.json"), vec![None]);
        assert_eq!(h.transport.count(REFRESH), 0);
        assert_eq!(h.session.read(), Some(token("t1")));
    }

    #[tokio::test]
    async fn absolute_urls_on_the_api_origin_are_authenticated() {
        let h = harness(Some("t1"));
        h.transport.respond(WIDGETS, json_response(200, json!([])));

        h.executor.execute(ApiRequest::get("https://app.test/api/v1/widgets")).await.unwrap();

        assert_eq!(h.transport.bearers_to(WIDGETS), vec![Some("t1".to_string())]);
    }

    #[tokio::test]
    async fn other_known_code_never_logs_out_after_refresh() {
        let h = harness(Some("t1"));
        let path = "/api/v1/users/me/password";
        h.transport.respond(path, json_response(401, json!({"code": 1002})));
        refresh_yields(&h.transport, "t2");

        let err = h.executor.execute(ApiRequest::put(path)).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.transport.count(path), 2);
        assert_eq!(h.session.read(), Some(token("t2")));
    }

    #[tokio::test]
    async fn failed_refresh_expires_session_once() {
        let h = harness(Some("t1"));
        let reports = "/api/v1/reports";
        h.transport.respond(WIDGETS, json_response(401, json!({"code": 1001})));
        h.transport.respond(reports, TransportResponse::new(StatusCode::UNAUTHORIZED));
        h.transport.route(REFRESH, |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json_response(401, json!({"code": 1001})))
        });
        let (seen, _sub) = record(&h.session);

        let (a, b) = futures::join!(
            h.executor.execute(ApiRequest::get("/widgets")),
            h.executor.execute(ApiRequest::get("/reports")),
        );

        assert_eq!(a.unwrap_err().status(), Some(401));
        assert_eq!(b.unwrap_err().status(), Some(401));
        assert_eq!(h.transport.count(REFRESH), 1);
        assert_eq!(logouts(&seen.lock()), 1);
        let state = h.session.snapshot();
        assert!(!state.is_authenticated());
        assert_eq!(state.flash(), Some(&Notification::session_expired()));
    }

    #[tokio::test]
    async fn concurrent_callers_recover_with_one_refresh() {
        let h = harness(Some("T1"));
        guarded(&h.transport, WIDGETS, "T2", json!({"code": 1001}));
        guarded(&h.transport, "/api/v1/reports", "T2", json!({"code": 1001}));
        refresh_yields(&h.transport, "T2");
        let (seen, _sub) = record(&h.session);

        let (a, b) = futures::join!(
            h.executor.execute(ApiRequest::get("/widgets")),
            h.executor.execute(ApiRequest::get("/reports")),
        );

        assert_eq!(a.unwrap(), Some(json!({"ok": true})));
        assert_eq!(b.unwrap(), Some(json!({"ok": true})));
        assert_eq!(h.transport.count(REFRESH), 1);
        let state = h.session.snapshot();
        assert_eq!(state.token(), Some(&token("T2")));
        assert!(state.flash().is_none());
        assert_eq!(logouts(&seen.lock()), 0);
        // initial delivery plus the single login
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn refresh_endpoint_401_is_not_recovered() {
        let h = harness(Some("t1"));
        refresh_rejected(&h.transport);

        let err = h.executor.execute(ApiRequest::post(REFRESH)).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.transport.count(REFRESH), 1);
        assert_eq!(h.session.read(), Some(token("t1")));
    }

    #[tokio::test]
    async fn missing_code_expires_session() {
        let h = harness(Some("t1"));
        h.transport.respond(
            WIDGETS,
            TransportResponse::with_body(StatusCode::UNAUTHORIZED, "text/plain", "no"),
        );
        refresh_rejected(&h.transport);

        h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();

        assert!(!h.session.is_authenticated());
        assert!(h.session.snapshot().flash().is_some());
    }

    #[tokio::test]
    async fn session_changed_elsewhere_is_not_logged_out() {
        let h = harness(Some("t1"));
        let session = Arc::clone(&h.session);
        h.transport.route(WIDGETS, move |_| {
            // another tab signed in while this request was in flight
            session.login(AccessToken::new("t3").unwrap());
            async { Ok(json_response(401, json!({"code": 1001}))) }
        });
        refresh_rejected(&h.transport);

        h.executor.execute(ApiRequest::get("/widgets")).await.unwrap_err();

        assert_eq!(h.session.read(), Some(token("t3")));
        assert!(h.session.snapshot().flash().is_none());
    }

    #[tokio::test]
    async fn anonymous_requests_skip_the_session_credential() {
        let h = harness(Some("t1"));
        h.transport.respond(WIDGETS, json_response(401, json!({"code": 1001})));
        refresh_yields(&h.transport, "t2");

        let err = h
            .executor
            .execute(ApiRequest::post("/widgets").without_credentials())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(h.transport.bearers_to(WIDGETS), vec![None]);
        assert_eq!(h.transport.count(REFRESH), 0);
        assert_eq!(h.session.read(), Some(token("t1")));
    }

    #[tokio::test]
    async fn reports_the_credential_that_succeeded() {
        let h = harness(Some("t1"));
        guarded(&h.transport, WIDGETS, "t2", json!({"code": 1001}));
        refresh_yields(&h.transport, "t2");

        let (_, used) = h.executor.execute_with_token(ApiRequest::get("/widgets")).await.unwrap();
        assert_eq!(used, Some(token("t2")));
    }

    #[tokio::test]
    async fn typed_helpers_decode_bodies() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Widget {
            id: u32,
            name: String,
        }

        let h = harness(Some("t1"));
        h.transport.respond(WIDGETS, json_response(200, json!({"id": 1, "name": "gear"})));

        let widget: Widget = h.executor.get("/widgets").await.unwrap();
        assert_eq!(widget, Widget { id: 1, name: "gear".into() });

        let err = h.executor.get::<Vec<Widget>>("/widgets").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
