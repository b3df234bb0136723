// src/auth/manager.rs
//! Auth-state owner shared by every store: persists the session and tells
//! registered listeners whenever it changes.

use anyhow::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use super::token;
use crate::core::storage::{PersistedSession, SessionPersistence, Storage};
use crate::types::User;

pub type AuthListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct AuthManager {
    storage: Arc<dyn Storage>,
    listeners: Mutex<Vec<(ListenerId, AuthListener)>>,
    next_id: AtomicU64,
}

impl AuthManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Logs the persisted state found at start-up.
    pub fn init(&self) {
        match self.token() {
            Some(token) => match token::expires_at(&token) {
                Some(deadline) if token::is_valid_token(&token) => {
                    info!("Persisted session valid until {}", deadline)
                }
                _ => warn!("Persisted session token is expired or unreadable"),
            },
            None => info!("No persisted session"),
        }
    }

    /// Drops every listener.
    pub fn dispose(&self) {
        let mut listeners = self.lock_listeners();
        info!("Disposing auth manager ({} listeners)", listeners.len());
        listeners.clear();
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn add_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    pub fn token(&self) -> Option<String> {
        SessionPersistence::new(self.storage.as_ref()).token()
    }

    pub fn persisted_session(&self) -> PersistedSession {
        SessionPersistence::new(self.storage.as_ref()).load_blob()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token()
            .map(|token| token::is_valid_token(&token))
            .unwrap_or(false)
    }

    pub fn set_auth(&self, token: &str, user: &User) -> Result<()> {
        let session = PersistedSession {
            user: Some(user.clone()),
            token: Some(token.to_string()),
        };
        SessionPersistence::new(self.storage.as_ref()).save(&session)?;
        info!("Session stored for user {}", user.username);
        self.notify();
        Ok(())
    }

    pub fn clear_auth(&self) -> Result<()> {
        SessionPersistence::new(self.storage.as_ref()).clear()?;
        info!("Session cleared");
        self.notify();
        Ok(())
    }

    /// Clears a persisted token that is no longer valid. Returns whether a
    /// session was dropped.
    pub fn expire_if_invalid(&self) -> Result<bool> {
        match self.token() {
            Some(token) if !token::is_valid_token(&token) => {
                warn!("Persisted session token expired; forcing logout");
                self.clear_auth()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Calls every listener in registration order, outside the lock, so a
    /// listener may add or remove listeners. A panicking listener is logged
    /// and skipped.
    pub fn notify(&self) {
        let snapshot: Vec<(ListenerId, AuthListener)> = self.lock_listeners().clone();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                error!("Auth listener {:?} panicked; continuing", id);
            }
        }
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, AuthListener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
