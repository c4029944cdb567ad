//! Client-side session holder and its change notifications.
//!
//! `SessionStore` owns the current session the way the provider's client library
//! would. Interested parties register a listener with
//! [`SessionStore::on_auth_state_change`] and get a [`Subscription`] back; dropping
//! the subscription (or calling [`Subscription::unsubscribe`]) detaches the listener.
//!
//! [`SessionView`] is the live, push-updated view of the current identity used to gate
//! the task view and render the navigation banner.

use crate::connectors::supabase::{AuthUser, Session};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

/// Auth state transitions, named after the provider's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
}

/// A notification delivered to listeners.
///
/// `sequence` grows with every published change, so a listener can tell a stale
/// notification from a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
    pub sequence: u64,
}

type Listener = Arc<dyn Fn(&SessionChange) + Send + Sync>;

#[derive(Default)]
struct State {
    sequence: u64,
    session: Option<Session>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared holder of the current session. Clones share the same state.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current session, if anyone is signed in.
    pub fn get_session(&self) -> Option<Session> {
        lock(&self.inner.state).session.clone()
    }

    /// The current state packaged as an `InitialSession` notification.
    pub fn snapshot(&self) -> SessionChange {
        let state = lock(&self.inner.state);
        SessionChange {
            event: AuthEvent::InitialSession,
            session: state.session.clone(),
            sequence: state.sequence,
        }
    }

    /// Registers `listener` for every future change.
    pub fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionChange) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Replaces the current session and notifies every listener.
    pub fn publish(&self, event: AuthEvent, session: Option<Session>) {
        let change = {
            let mut state = lock(&self.inner.state);
            state.sequence += 1;
            state.session = session.clone();
            SessionChange {
                event,
                session,
                sequence: state.sequence,
            }
        };
        // Listeners run outside the locks so they may read the store again.
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        debug!(
            ?event,
            sequence = change.sequence,
            listeners = listeners.len(),
            "Publishing auth state change"
        );
        for listener in listeners {
            listener(&change);
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }
}

/// Disposer returned by [`SessionStore::on_auth_state_change`].
#[must_use = "dropping the subscription detaches the listener"]
pub struct Subscription {
    id: u64,
    store: Weak<Inner>,
}

impl Subscription {
    /// Detaches the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            lock(&inner.listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

#[derive(Debug, Default)]
struct Observed {
    sequence: u64,
    user: Option<AuthUser>,
}

impl Observed {
    fn apply(&mut self, change: &SessionChange) {
        if change.sequence < self.sequence {
            return;
        }
        self.sequence = change.sequence;
        self.user = change.session.as_ref().map(|session| session.user.clone());
    }
}

/// Live view of who is signed in, kept current by store notifications.
pub struct SessionView {
    observed: Arc<Mutex<Observed>>,
    _subscription: Subscription,
}

impl SessionView {
    /// Subscribes to `store`, then synchronizes the initial snapshot.
    ///
    /// Subscribing first means a change published in between is not lost; the
    /// sequence check keeps whichever of the two is newer.
    pub fn attach(store: &SessionStore) -> Self {
        let observed = Arc::new(Mutex::new(Observed::default()));
        let sink = observed.clone();
        let subscription = store.on_auth_state_change(move |change| lock(&sink).apply(change));
        lock(&observed).apply(&store.snapshot());
        Self {
            observed,
            _subscription: subscription,
        }
    }

    pub fn user(&self) -> Option<AuthUser> {
        lock(&self.observed).user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.observed).user.is_some()
    }

    /// Stops following the store.
    pub fn detach(self) {}
}
