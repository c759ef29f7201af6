//! Single-flight token refresh
//!
//! At most one refresh request is in flight at any time. Every caller that
//! arrives while it runs attaches to the same shared result. The network
//! call runs on its own task so it completes even if every caller stops
//! waiting.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use authgate_domain::{AccessToken, SessionTokenResponse};
use futures::future::{BoxFuture, FutureExt, Shared};
use http::header::ACCEPT;
use http::{HeaderMap, HeaderValue, Method};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use super::ports::{Transport, TransportRequest};
use crate::session::store::SessionStore;

type PendingRefresh = Shared<BoxFuture<'static, Option<AccessToken>>>;

struct InFlight {
    generation: u64,
    result: PendingRefresh,
}

struct RefreshInner {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    endpoint: Url,
    in_flight: Mutex<Option<InFlight>>,
    generations: AtomicU64,
}

/// Deduplicates concurrent refresh attempts into one request.
///
/// Cheap to clone; clones share the in-flight slot.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>, endpoint: Url) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                transport,
                session,
                endpoint,
                in_flight: Mutex::new(None),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().is_some()
    }

    /// Obtain a fresh access token.
    ///
    /// Joins the in-flight refresh if there is one, otherwise starts it. On
    /// success the session is logged in with the new token before any
    /// caller sees it. Any failure resolves to `None` and leaves the session
    /// untouched.
    pub async fn refresh(&self) -> Option<AccessToken> {
        let pending = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!(generation = in_flight.generation, "joining in-flight token refresh");
                    in_flight.result.clone()
                }
                None => {
                    let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
                    let result = self.start(generation);
                    *slot = Some(InFlight { generation, result: result.clone() });
                    result
                }
            }
        };

        pending.await
    }

    /// Spawn the refresh task. Must be called with the slot locked so the
    /// task cannot settle before its slot entry exists.
    fn start(&self, generation: u64) -> PendingRefresh {
        debug!(generation, endpoint = %self.inner.endpoint, "starting token refresh");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let token = inner.perform().await;
            inner.settle(generation);
            token
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match task.await {
                Ok(token) => token,
                Err(err) => {
                    error!(error = %err, "token refresh task failed");
                    inner.settle(generation);
                    None
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl RefreshInner {
    async fn perform(&self) -> Option<AccessToken> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let request = TransportRequest {
            method: Method::POST,
            url: self.endpoint.clone(),
            headers,
            body: None,
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "token refresh could not reach the server");
                return None;
            }
        };

        if !response.status.is_success() {
            warn!(status = response.status.as_u16(), "token refresh rejected");
            return None;
        }

        let Some(body) = response.json_as::<SessionTokenResponse>() else {
            warn!(status = response.status.as_u16(), "token refresh response has no token");
            return None;
        };

        match AccessToken::new(body.token) {
            Ok(token) => {
                self.session.login(token.clone());
                info!(expires_in = ?body.expires_in, "access token refreshed");
                Some(token)
            }
            Err(err) => {
                warn!(error = %err, "token refresh returned an unusable token");
                None
            }
        }
    }

    /// Clear the slot if it still holds `generation`.
    fn settle(&self, generation: u64) {
        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|in_flight| in_flight.generation == generation) {
            *slot = None;
        }
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
