//! In-memory transport for tests
//!
//! Routes requests by URL path to async handlers and records everything it
//! was asked to send. Unrouted paths answer `404`.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use authgate_domain::TransportError;
use futures::future::{BoxFuture, FutureExt};
use http::header::AUTHORIZATION;
use http::StatusCode;
use parking_lot::Mutex;

use crate::api::ports::{Transport, TransportRequest, TransportResponse};

type Handler = Arc<
    dyn Fn(TransportRequest) -> BoxFuture<'static, Result<TransportResponse, TransportError>>
        + Send
        + Sync,
>;

#[derive(Default)]
struct Script {
    routes: HashMap<String, Handler>,
    requests: Vec<TransportRequest>,
}

/// Scripted [`Transport`]; clones share routes and the request log
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `path` with `handler`, replacing any earlier route.
    pub fn route<F, Fut>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransportResponse, TransportError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |request| handler(request).boxed());
        self.script.lock().routes.insert(path.to_string(), handler);
        self
    }

    /// Answer every request to `path` with a copy of `response`.
    pub fn respond(&self, path: &str, response: TransportResponse) -> &Self {
        self.route(path, move |_| {
            let response = response.clone();
            async move { Ok(response) }
        })
    }

    /// Answer requests to `path` with `responses` in order, repeating the
    /// last one once the list runs out.
    pub fn respond_sequence(&self, path: &str, responses: Vec<TransportResponse>) -> &Self {
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        self.route(path, move |_| {
            let next = {
                let mut queue = queue.lock();
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            };
            async move { Ok(next.unwrap_or_else(|| TransportResponse::new(StatusCode::NOT_FOUND))) }
        })
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.script.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<TransportRequest> {
        self.script.lock().requests.iter().filter(|r| r.url.path() == path).cloned().collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.script.lock().requests.iter().filter(|r| r.url.path() == path).count()
    }

    /// Bearer tokens presented to `path`, in order (`None` for anonymous).
    pub fn bearers_to(&self, path: &str) -> Vec<Option<String>> {
        self.requests_to(path)
            .iter()
            .map(|r| {
                r.headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::to_owned)
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let handler = {
            let mut script = self.script.lock();
            script.requests.push(request.clone());
            script.routes.get(request.url.path()).cloned()
        };

        match handler {
            Some(handler) => handler(request).await,
            None => Ok(TransportResponse::new(StatusCode::NOT_FOUND)),
        }
    }
}
