//! Live authentication status.
//!
//! [`SessionTracker`] mirrors whether the identity service currently holds a
//! session. It never decides that on its own: the value comes from one
//! initial query and then from change notifications only.

use crate::auth::AuthError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_at <= now_unix + EXPIRY_MARGIN_SECS
    }
}

/// Tokens this close to expiry are refreshed before use.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl AuthEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthEvent::SignedIn => "signedIn",
            AuthEvent::SignedOut => "signedOut",
            AuthEvent::TokenRefreshed => "tokenRefreshed",
        }
    }
}

pub type AuthListener = Box<dyn Fn(AuthEvent, Option<&AuthSession>) + Send + Sync>;

/// The slice of the identity service the tracker depends on.
pub trait AuthService {
    fn current_session(&self) -> Result<Option<AuthSession>, AuthError>;

    /// The listener stays registered until the returned handle is dropped.
    fn subscribe(&self, listener: AuthListener) -> Subscription;

    /// Completion is reported through the listeners, not the return value.
    fn sign_out(&self) -> Result<(), AuthError>;
}

type SharedListener = Arc<dyn Fn(AuthEvent, Option<&AuthSession>) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: BTreeMap<u64, SharedListener>,
}

/// Registry of change listeners, shared by every [`AuthService`] impl.
#[derive(Clone, Default)]
pub struct AuthListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl AuthListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: AuthListener) -> Subscription {
        let mut table = self.table.lock().unwrap_or_else(|p| p.into_inner());
        let id = table.next_id;
        table.next_id += 1;
        table.listeners.insert(id, Arc::from(listener));
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    pub fn notify(&self, event: AuthEvent, session: Option<&AuthSession>) {
        // Call outside the lock so a listener may subscribe or unsubscribe.
        let listeners: Vec<SharedListener> = {
            let table = self.table.lock().unwrap_or_else(|p| p.into_inner());
            table.listeners.values().cloned().collect()
        };
        tracing::debug!(event = event.as_str(), listeners = listeners.len(), "auth state change");
        for listener in listeners {
            listener(event, session);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .listeners
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration handle. Dropping it removes the listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            let mut table = table.lock().unwrap_or_else(|p| p.into_inner());
            table.listeners.remove(&self.id);
        }
    }
}

pub struct SessionTracker {
    authenticated: Arc<AtomicBool>,
    subscription: Option<Subscription>,
}

impl SessionTracker {
    /// Registers for changes and seeds the signal from the current session.
    pub fn attach(service: &dyn AuthService) -> Self {
        let authenticated = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&authenticated);
        let subscription = service.subscribe(Box::new(
            move |event: AuthEvent, session: Option<&AuthSession>| {
                let signed_in = session.is_some();
                flag.store(signed_in, Ordering::SeqCst);
                tracing::info!(event = event.as_str(), authenticated = signed_in, "session changed");
            },
        ));

        match service.current_session() {
            Ok(session) => authenticated.store(session.is_some(), Ordering::SeqCst),
            Err(e) => {
                tracing::warn!(error = %e, "initial session query failed");
                authenticated.store(false, Ordering::SeqCst);
            }
        }

        Self {
            authenticated,
            subscription: Some(subscription),
        }
    }

    /// A tracker for shells with no identity service at all.
    pub fn detached() -> Self {
        Self {
            authenticated: Arc::new(AtomicBool::new(false)),
            subscription: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Asks the service to end the session. The signal flips when the
    /// service's notification arrives.
    pub fn sign_out(&self, service: &dyn AuthService) -> Result<(), AuthError> {
        service.sign_out()
    }

    /// Releases the change registration. The signal keeps its last value.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
