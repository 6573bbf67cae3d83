use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::claims::{self, Claims};
use crate::store::{ACCESS_TOKEN_KEY, DISPLAY_NAME_KEY, REFRESH_TOKEN_KEY, TokenStore};

/// Current sign-in state as seen by views.
///
/// `is_logged_in` is true exactly when `access_token` is present and decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_logged_in: bool,
    pub display_name: Option<String>,
}

/// A session together with the claims it was derived from.
///
/// Delivered to subscribers so they never pair a session with stale claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub session: Session,
    pub claims: Option<Claims>,
}

/// Handle returned by [`SessionState::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&SessionUpdate) + Send + Sync>;

/// Session service backed by a [`TokenStore`].
///
/// Mutators are serialized: each one writes the store and re-derives claims
/// and the session under the writer lock, then releases it and notifies every
/// subscriber before returning. A subscriber may read the state or call a
/// mutator; the nested mutation notifies on its own.
pub struct SessionState<T> {
    store: T,
    current: RwLock<Session>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    writer: Mutex<()>,
    next_id: AtomicU64,
}

impl<T: TokenStore> SessionState<T> {
    /// Build the initial session from whatever the store holds.
    ///
    /// An undecodable stored token is discarded here.
    pub fn new(store: T) -> Self {
        let state = Self {
            store,
            current: RwLock::new(Session::default()),
            subscribers: Mutex::new(Vec::new()),
            writer: Mutex::new(()),
            next_id: AtomicU64::new(0),
        };
        let initial = state.derive();
        *state.current.write() = initial.session;
        state
    }

    #[must_use]
    pub fn store(&self) -> &T {
        &self.store
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.current.read().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.current.read().is_logged_in
    }

    /// Claims of the current access token, decoded afresh on every call.
    #[must_use]
    pub fn claims(&self) -> Option<Claims> {
        let token = self.current.read().access_token.clone()?;
        claims::decode(&token).ok()
    }

    /// Store a token pair from a code exchange or password login.
    ///
    /// Without a refresh token any stale one is removed. A cached display name
    /// belongs to the previous identity and is dropped.
    pub fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Session {
        let update = {
            let _writer = self.writer.lock();
            self.store.set(ACCESS_TOKEN_KEY, access_token);
            match refresh_token {
                Some(refresh) => self.store.set(REFRESH_TOKEN_KEY, refresh),
                None => self.store.remove(REFRESH_TOKEN_KEY),
            }
            self.store.remove(DISPLAY_NAME_KEY);
            self.apply()
        };
        self.notify(update)
    }

    /// Store a token handed over directly in the redirect (`?token=`).
    pub fn set_direct_token(&self, token: &str) -> Session {
        let update = {
            let _writer = self.writer.lock();
            self.store.set(ACCESS_TOKEN_KEY, token);
            self.store.remove(REFRESH_TOKEN_KEY);
            self.store.remove(DISPLAY_NAME_KEY);
            self.apply()
        };
        self.notify(update)
    }

    /// Store a token re-issued by the game-account link callback.
    ///
    /// The refresh token is left alone; the display name is cached when given.
    pub fn set_linked_token(&self, token: &str, display_name: Option<&str>) -> Session {
        let update = {
            let _writer = self.writer.lock();
            self.store.set(ACCESS_TOKEN_KEY, token);
            if let Some(name) = display_name {
                self.store.set(DISPLAY_NAME_KEY, name);
            }
            self.apply()
        };
        self.notify(update)
    }

    /// Sign out: drop every persisted session key.
    pub fn clear(&self) -> Session {
        let update = {
            let _writer = self.writer.lock();
            self.discard();
            self.apply()
        };
        self.notify(update)
    }

    /// Re-derive the session from the store, which may have been written by
    /// someone else. Subscribers hear about it only if the session changed.
    pub fn reload(&self) -> Session {
        let update = {
            let _writer = self.writer.lock();
            let update = self.derive();
            if *self.current.read() == update.session {
                return update.session;
            }
            *self.current.write() = update.session.clone();
            update
        };
        self.notify(update)
    }

    /// Register a callback invoked synchronously after every mutation.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&SessionUpdate) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(subscriber)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    // Caller holds the writer lock.
    fn apply(&self) -> SessionUpdate {
        let update = self.derive();
        *self.current.write() = update.session.clone();
        update
    }

    // Runs with no lock held, so a subscriber may call back into a mutator.
    fn notify(&self, update: SessionUpdate) -> Session {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        for subscriber in subscribers {
            subscriber(&update);
        }

        update.session
    }

    fn derive(&self) -> SessionUpdate {
        let Some(token) = self.store.get(ACCESS_TOKEN_KEY) else {
            return SessionUpdate {
                session: Session {
                    refresh_token: self.store.get(REFRESH_TOKEN_KEY),
                    ..Session::default()
                },
                claims: None,
            };
        };

        let claims = match claims::decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable access token");
                self.discard();
                return SessionUpdate {
                    session: Session::default(),
                    claims: None,
                };
            }
        };

        let display_name = claims
            .name
            .clone()
            .or_else(|| self.store.get(DISPLAY_NAME_KEY));

        SessionUpdate {
            session: Session {
                access_token: Some(token),
                refresh_token: self.store.get(REFRESH_TOKEN_KEY),
                is_logged_in: true,
                display_name,
            },
            claims: Some(claims),
        }
    }

    fn discard(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
        self.store.remove(DISPLAY_NAME_KEY);
    }
}
