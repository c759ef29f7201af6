//! Observable session state container
//!
//! Reads never block on observers: the state sits behind a `RwLock` whose
//! write half is held only for the duration of a mutation. Mutations and
//! their notifications are serialized by a separate lock so every subscriber
//! sees every applied transition, in order.
//!
//! Listeners run synchronously on the mutating thread. They may read the
//! store and drop their own subscription, but must not mutate the store or
//! subscribe from inside a callback.

use std::fmt;
use std::sync::{Arc, Weak};

use authgate_domain::{AccessToken, AuthUser, LogoutReason, SessionState};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Shared authentication state with synchronous change notification
pub struct SessionStore {
    state: RwLock<SessionState>,
    mutation: Mutex<()>,
    listeners: Arc<Mutex<Listeners>>,
}

impl SessionStore {
    /// Unauthenticated store, as at process start
    pub fn new() -> Self {
        Self::from_state(SessionState::unauthenticated())
    }

    /// Store seeded with a token restored by the embedding application
    pub fn with_token(token: AccessToken) -> Self {
        Self::from_state(SessionState::authenticated(token))
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            state: RwLock::new(state),
            mutation: Mutex::new(()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Current token, if authenticated
    pub fn read(&self) -> Option<AccessToken> {
        self.state.read().token().cloned()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    /// Enter the authenticated state with `token`.
    ///
    /// Clears the flash and any synced identity.
    pub fn login(&self, token: AccessToken) {
        let role = token.role();
        self.apply(|state| {
            *state = SessionState::authenticated(token);
            true
        });
        info!(%role, "session authenticated");
    }

    /// Leave the authenticated state. Only `Expired` leaves a flash.
    pub fn logout(&self, reason: LogoutReason) {
        self.apply(|state| {
            *state = SessionState::logged_out(reason);
            true
        });
        info!(%reason, "session ended");
    }

    /// Log out only if the current token is still `expected`.
    ///
    /// The comparison and the transition happen under the same lock, so
    /// concurrent callers that all started from `expected` produce exactly
    /// one logout. Returns whether this call logged out.
    pub fn logout_if_token(&self, expected: &AccessToken, reason: LogoutReason) -> bool {
        let applied = self.apply(|state| {
            if state.token() != Some(expected) {
                return false;
            }
            *state = SessionState::logged_out(reason);
            true
        });
        if applied {
            info!(%reason, "session ended");
        } else {
            debug!("session already changed; skipping logout");
        }
        applied
    }

    /// Dismiss the pending flash. Idempotent.
    pub fn clear_flash(&self) {
        self.apply(SessionState::clear_flash);
    }

    /// Attach identity data to the current session. Ignored while signed
    /// out. Returns whether it applied.
    pub fn sync_identity(&self, user: Option<AuthUser>) -> bool {
        self.apply(|state| state.sync_identity(user))
    }

    /// Attach identity data only if the session still holds `expected`.
    pub fn sync_identity_if_token(&self, expected: &AccessToken, user: Option<AuthUser>) -> bool {
        let applied = self.apply(|state| {
            if state.token() != Some(expected) {
                return false;
            }
            state.sync_identity(user)
        });
        if !applied {
            debug!("discarding identity for a session that is no longer current");
        }
        applied
    }

    /// Register `listener`.
    ///
    /// It is called immediately with the current state, then after every
    /// applied mutation until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let _serial = self.mutation.lock();

        let id = {
            let mut listeners = self.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::clone(&listener)));
            id
        };

        let current = self.snapshot();
        listener(&current);

        Subscription { id, listeners: Arc::downgrade(&self.listeners) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    /// Run `mutate` under the write lock and notify listeners if it reports a
    /// change. Returns the value `mutate` returned.
    fn apply<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut SessionState) -> bool,
    {
        let _serial = self.mutation.lock();

        let snapshot = {
            let mut state = self.state.write();
            if !mutate(&mut state) {
                return false;
            }
            state.clone()
        };

        // Listeners may unsubscribe from inside the callback, so call a copy.
        let listeners: Vec<Listener> =
            self.listeners.lock().entries.iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(&snapshot);
        }
        true
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle for a registered listener; unsubscribes on drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Explicitly unsubscribe
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
