//! Session workflows
//!
//! Sign-in, sign-out, bootstrap and identity sync, built on the request
//! executor so they share its credential handling.

use std::sync::Arc;

use authgate_domain::constants::{
    DEFAULT_CURRENT_SESSION_PATH, DEFAULT_CURRENT_USER_PATH, DEFAULT_SESSIONS_PATH,
};
use authgate_domain::{
    AccessToken, AuthUser, ClientConfig, Credentials, CurrentUserProfile, LogoutReason,
    SessionTokenResponse,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::store::SessionStore;
use crate::api::errors::ApiError;
use crate::api::executor::ApiExecutor;
use crate::api::request::ApiRequest;

/// Endpoints used by the session workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub sessions: String,
    pub current_session: String,
    pub current_user: String,
}

impl SessionPaths {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            sessions: config.sessions_path.clone(),
            current_session: config.current_session_path.clone(),
            current_user: config.current_user_path.clone(),
        }
    }
}

impl Default for SessionPaths {
    fn default() -> Self {
        Self {
            sessions: DEFAULT_SESSIONS_PATH.to_string(),
            current_session: DEFAULT_CURRENT_SESSION_PATH.to_string(),
            current_user: DEFAULT_CURRENT_USER_PATH.to_string(),
        }
    }
}

/// Session lifecycle operations for the embedding application
pub struct SessionService {
    executor: Arc<ApiExecutor>,
    paths: SessionPaths,
}

impl SessionService {
    pub fn new(executor: Arc<ApiExecutor>, paths: SessionPaths) -> Self {
        Self { executor, paths }
    }

    fn session(&self) -> &SessionStore {
        self.executor.session()
    }

    /// Exchange credentials for an access token and log in with it.
    ///
    /// The request is sent without any existing credential, so a rejected
    /// sign-in surfaces as-is and never touches the current session.
    ///
    /// # Errors
    /// Returns the `ApiError` of the sign-in request, or `ApiError::Decode`
    /// if the response carries no usable token.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<AccessToken, ApiError> {
        let request = ApiRequest::post(self.paths.sessions.as_str())
            .json(credentials)?
            .without_credentials();
        let response: SessionTokenResponse = self.executor.send(request).await?;
        let token =
            AccessToken::new(response.token).map_err(|e| ApiError::Decode(e.to_string()))?;

        self.session().login(token.clone());
        info!(expires_in = ?response.expires_in, "signed in");
        Ok(token)
    }

    /// End the session on the server (best effort) and locally.
    ///
    /// Always leaves the store signed out without a flash.
    pub async fn sign_out(&self) {
        if self.session().is_authenticated() {
            let request = ApiRequest::delete(self.paths.current_session.as_str());
            if let Err(err) = self.executor.execute(request).await {
                warn!(error = %err, "server-side sign-out failed");
            }
        }
        self.session().logout(LogoutReason::Manual);
    }

    /// Bootstrap step: make sure there is a usable session.
    ///
    /// Returns `true` immediately when already authenticated, otherwise
    /// attempts a token refresh (the server may still hold a refresh cookie).
    /// A failed attempt leaves the store untouched.
    pub async fn ensure_session(&self) -> bool {
        if self.session().is_authenticated() {
            return true;
        }
        let restored = self.executor.refresh_coordinator().refresh().await.is_some();
        debug!(restored, "session bootstrap finished");
        restored
    }

    /// Fetch the current user and attach it to the session.
    ///
    /// Returns `Ok(None)` when signed out, when the profile is incomplete, or
    /// when the session changed while the request was in flight.
    ///
    /// # Errors
    /// Returns the `ApiError` of the profile request.
    pub async fn sync_current_user(&self) -> Result<Option<AuthUser>, ApiError> {
        if !self.session().is_authenticated() {
            return Ok(None);
        }

        let request = ApiRequest::get(self.paths.current_user.as_str());
        let (body, token) = self.executor.execute_with_token(request).await?;
        let Some(token) = token else {
            return Ok(None);
        };

        let profile: CurrentUserProfile = serde_json::from_value(body.unwrap_or(Value::Null))
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let Some(user) = AuthUser::from_profile(&profile) else {
            warn!("current user profile is missing required fields; keeping synced identity");
            return Ok(None);
        };

        if !self.session().sync_identity_if_token(&token, Some(user.clone())) {
            return Ok(None);
        }
        Ok(Some(user))
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").field("paths", &self.paths).finish_non_exhaustive()
    }
}
