//! Composition root
//!
//! Wires one session store, one refresh coordinator, the executor and the
//! session service around a single transport.

use std::sync::Arc;

use authgate_core::{
    ApiExecutor, ExecutorConfig, RefreshCoordinator, SessionPaths, SessionService, SessionStore,
    Transport,
};
use authgate_domain::{ClientConfig, Result};
use tracing::info;

use crate::http::HttpClient;

/// Fully wired client
pub struct ClientContext {
    config: ClientConfig,
    session: Arc<SessionStore>,
    refresh: RefreshCoordinator,
    executor: Arc<ApiExecutor>,
    service: Arc<SessionService>,
}

impl ClientContext {
    /// Build the client over a reqwest transport.
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = HttpClient::from_config(&config.http)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build the client over any transport, starting signed out.
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` if the configuration is invalid.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::with_session(config, transport, Arc::new(SessionStore::new()))
    }

    /// Build the client around an existing store, e.g. one seeded with a
    /// token restored from storage.
    ///
    /// # Errors
    /// Returns `AuthGateError::Config` if the configuration is invalid.
    pub fn with_session(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
    ) -> Result<Self> {
        let executor_config = ExecutorConfig::from_client_config(&config)?;
        let refresh = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&session),
            executor_config.refresh_url()?,
        );
        let executor = Arc::new(ApiExecutor::new(
            transport,
            Arc::clone(&session),
            refresh.clone(),
            executor_config,
        ));
        let service = Arc::new(SessionService::new(
            Arc::clone(&executor),
            SessionPaths::from_client_config(&config),
        ));

        info!(base_url = %config.base_url, "client context ready");
        Ok(Self { config, session, refresh, executor, service })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn refresh(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn executor(&self) -> &Arc<ApiExecutor> {
        &self.executor
    }

    pub fn service(&self) -> &Arc<SessionService> {
        &self.service
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use authgate_core::testing::ScriptedTransport;
    use authgate_domain::{AccessToken, AuthGateError};

    use super::*;

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = ClientConfig::new("https://app.test");
        config.refresh_path = "sessions/refresh".into();

        let result = ClientContext::with_transport(config, Arc::new(ScriptedTransport::new()));
        assert!(matches!(result, Err(AuthGateError::Config(_))));
    }

    #[test]
    fn components_share_one_store() {
        let session = Arc::new(SessionStore::with_token(AccessToken::new("t1").unwrap()));
        let context = ClientContext::with_session(
            ClientConfig::new("https://app.test"),
            Arc::new(ScriptedTransport::new()),
            Arc::clone(&session),
        )
        .unwrap();

        assert!(Arc::ptr_eq(context.session(), &session));
        assert!(Arc::ptr_eq(context.executor().session(), &session));
        assert_eq!(context.refresh().endpoint().as_str(), "https://app.test/api/v1/sessions/refresh");
    }

    #[test]
    fn builds_over_http() {
        let context = ClientContext::from_config(ClientConfig::new("https://app.test")).unwrap();
        assert!(!context.session().is_authenticated());
    }
}
