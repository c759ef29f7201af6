//! Session state types
//!
//! `SessionState` is the value the session store publishes to observers.
//! Its constructors are the only way to change the token, so a state with a
//! token is always authenticated and a state without one never is.

use std::fmt;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::user::{AuthUser, PermissionSet};
use crate::constants::{SESSION_EXPIRED_MESSAGE, SESSION_EXPIRED_TITLE};
use crate::errors::AuthGateError;
use crate::impl_domain_str_conversions;

/// Bearer credential issued by the sessions endpoints.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    ///
    /// # Errors
    /// Returns `AuthGateError::InvalidInput` when the token is blank.
    pub fn new(raw: impl Into<String>) -> crate::Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AuthGateError::InvalidInput("access token must not be blank".into()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Role claim carried in the JWT payload.
    ///
    /// Anything that is not a decodable JWT with `"role": "admin"` is treated
    /// as a regular user.
    pub fn role(&self) -> AuthRole {
        let Some(payload) = self.0.split('.').nth(1) else {
            return AuthRole::User;
        };

        // Issuers disagree on the alphabet; accept URL-safe and standard.
        let payload = payload.trim_end_matches('=');
        let claims = URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| STANDARD_NO_PAD.decode(payload))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok());

        match claims.as_ref().and_then(|c| c.get("role")).and_then(|r| r.as_str()) {
            Some("admin") => AuthRole::Admin,
            _ => AuthRole::User,
        }
    }
}

impl TryFrom<String> for AccessToken {
    type Error = AuthGateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccessToken> for String {
    fn from(token: AccessToken) -> Self {
        token.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<redacted, {} bytes>)", self.0.len())
    }
}

/// Role encoded in the access token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRole {
    Admin,
    #[default]
    User,
}

impl_domain_str_conversions!(AuthRole {
    Admin => "admin",
    User => "user",
});

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutReason {
    /// The user asked to sign out.
    Manual,
    /// The credential stopped being accepted and could not be refreshed.
    Expired,
}

impl_domain_str_conversions!(LogoutReason {
    Manual => "manual",
    Expired => "expired",
});

/// One-shot message queued for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { title: title.into(), message: message.into() }
    }

    /// Notice attached when a session is ended by expiry.
    pub fn session_expired() -> Self {
        Self::new(SESSION_EXPIRED_TITLE, SESSION_EXPIRED_MESSAGE)
    }
}

/// Authentication state observed by the UI and the request executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    token: Option<AccessToken>,
    user: Option<AuthUser>,
    flash: Option<Notification>,
}

impl SessionState {
    /// Process-start state: no token, no identity, no flash.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// Fresh authenticated state. Identity data is dropped so it gets
    /// re-synced for the new token.
    pub fn authenticated(token: AccessToken) -> Self {
        Self { token: Some(token), user: None, flash: None }
    }

    /// Signed-out state. Only an expiry leaves a flash behind.
    pub fn logged_out(reason: LogoutReason) -> Self {
        let flash = match reason {
            LogoutReason::Expired => Some(Notification::session_expired()),
            LogoutReason::Manual => None,
        };
        Self { token: None, user: None, flash }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn flash(&self) -> Option<&Notification> {
        self.flash.as_ref()
    }

    /// Role claim of the current token; `User` when signed out.
    pub fn role(&self) -> AuthRole {
        self.token.as_ref().map_or(AuthRole::User, AccessToken::role)
    }

    /// Permissions of the synced identity; empty until a sync lands.
    pub fn permissions(&self) -> PermissionSet {
        self.user.as_ref().map(AuthUser::permission_set).unwrap_or_default()
    }

    /// Drop the pending flash. Returns whether anything changed.
    pub fn clear_flash(&mut self) -> bool {
        self.flash.take().is_some()
    }

    /// Attach identity data. Ignored while signed out so a response from a
    /// stale session cannot resurrect a user. Returns whether it applied.
    pub fn sync_identity(&mut self, user: Option<AuthUser>) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.user = user;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_payload(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", URL_SAFE_NO_PAD.encode(payload))
    }

    fn user() -> AuthUser {
        AuthUser {
            sub: "u-1".into(),
            display_name: "Ada".into(),
            email: "ada@example.com".into(),
            avatar_url: None,
            permissions: vec!["users:read".into()],
        }
    }

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(AccessToken::new("").is_err());
        assert!(AccessToken::new("   ").is_err());
        assert_eq!(AccessToken::new("t-1").unwrap().as_str(), "t-1");
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let token = AccessToken::new("super-secret").unwrap();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
        assert_eq!(token.bearer(), "Bearer super-secret");
    }

    #[test]
    fn role_is_read_from_jwt_payload() {
        let admin = AccessToken::new(jwt_with_payload(r#"{"sub":"1","role":"admin"}"#)).unwrap();
        let plain = AccessToken::new(jwt_with_payload(r#"{"sub":"1","role":"user"}"#)).unwrap();
        let opaque = AccessToken::new("not-a-jwt").unwrap();
        let garbage = AccessToken::new("a.%%%.c").unwrap();

        assert_eq!(admin.role(), AuthRole::Admin);
        assert_eq!(plain.role(), AuthRole::User);
        assert_eq!(opaque.role(), AuthRole::User);
        assert_eq!(garbage.role(), AuthRole::User);
    }

    #[test]
    fn role_accepts_standard_base64_payloads() {
        // "??>>" forces a '+' into the standard alphabet
        let payload = r#"{"role":"admin","n":"??>>"}"#;
        let encoded = STANDARD_NO_PAD.encode(payload);
        assert!(encoded.contains('+'));

        let token = AccessToken::new(format!("eyJhbGciOiJIUzI1NiJ9.{encoded}.sig")).unwrap();
        assert_eq!(token.role(), AuthRole::Admin);
    }

    #[test]
    fn authentication_follows_token_presence() {
        let state = SessionState::authenticated(AccessToken::new("t-1").unwrap());
        assert!(state.is_authenticated());
        assert!(state.flash().is_none());

        let state = SessionState::logged_out(LogoutReason::Manual);
        assert!(!state.is_authenticated());
        assert!(state.token().is_none());
        assert!(state.flash().is_none());
    }

    #[test]
    fn expiry_logout_leaves_a_flash() {
        let mut state = SessionState::logged_out(LogoutReason::Expired);
        assert_eq!(state.flash(), Some(&Notification::session_expired()));

        assert!(state.clear_flash());
        assert!(!state.clear_flash());
        assert!(state.flash().is_none());
    }

    #[test]
    fn identity_sync_requires_a_session() {
        let mut signed_out = SessionState::unauthenticated();
        assert!(!signed_out.sync_identity(Some(user())));
        assert!(signed_out.user().is_none());

        let mut signed_in = SessionState::authenticated(AccessToken::new("t-1").unwrap());
        assert!(signed_in.sync_identity(Some(user())));
        assert!(signed_in.permissions().can("users:read"));
    }

    #[test]
    fn logout_reason_parses_from_strings() {
        assert_eq!("expired".parse::<LogoutReason>().unwrap(), LogoutReason::Expired);
        assert_eq!(LogoutReason::Manual.to_string(), "manual");
    }
}
