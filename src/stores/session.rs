// src/stores/session.rs
//! Persisted, observable session: who is logged in and with which token.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::auth::permissions::{can_access_route, has_permission, Permission};
use crate::auth::token::is_valid_token;
use crate::auth::{AuthManager, ListenerId};
use crate::core::request::{ApiClient, RequestOptions};
use crate::core::storage::{PersistedSession, SessionPersistence};
use crate::types::{ApiResponse, LoginRequest, RegisterRequest, User, UserUpdate};

use super::failure_message;

const LOGIN_ENDPOINT: &str = "/users/login";
const REGISTER_ENDPOINT: &str = "/users/register";
const PROFILE_ENDPOINT: &str = "/users/profile";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Transient flags; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRuntime {
    pub status: SessionStatus,
    pub hydrated: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub persisted: PersistedSession,
    pub runtime: SessionRuntime,
}

/// What UI code reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

fn is_usable(session: &PersistedSession) -> bool {
    session.user.is_some()
        && session
            .token
            .as_deref()
            .map(is_valid_token)
            .unwrap_or(false)
}

impl SessionState {
    /// user present, token present and unexpired.
    pub fn is_authenticated(&self) -> bool {
        is_usable(&self.persisted)
    }

    pub fn is_loading(&self) -> bool {
        !self.runtime.hydrated || self.runtime.status == SessionStatus::Authenticating
    }

    pub fn session(&self) -> Session {
        Session {
            user: self.persisted.user.clone(),
            token: self.persisted.token.clone(),
            is_authenticated: self.is_authenticated(),
        }
    }
}

/// Outcome of the start-up pass over the two persisted representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Empty,
    Consistent,
    LegacyRewritten,
    BlobRebuilt,
    Expired,
    Discarded,
}

pub struct SessionStore {
    client: ApiClient,
    auth: Arc<AuthManager>,
    state: watch::Sender<SessionState>,
    listener: Mutex<Option<ListenerId>>,
}

impl SessionStore {
    /// Also registers an auth listener so an out-of-band `clear_auth`
    /// resets this store.
    pub fn new(client: ApiClient, auth: Arc<AuthManager>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let store = Arc::new(Self {
            client,
            auth: auth.clone(),
            state,
            listener: Mutex::new(None),
        });

        let weak = Arc::downgrade(&store);
        let id = auth.add_listener(move || {
            if let Some(store) = weak.upgrade() {
                store.sync_from_storage();
            }
        });
        *store
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id);

        store
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().session()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().persisted.user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// True until `hydrate` has run, and while a login is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().runtime.error.clone()
    }

    pub fn can(&self, permission: Permission) -> bool {
        has_permission(self.state.borrow().persisted.user.as_ref(), permission)
    }

    /// Route guard; an expired session counts as anonymous.
    pub fn can_access(&self, path: &str) -> bool {
        let state = self.state.borrow();
        let user = if state.is_authenticated() {
            state.persisted.user.as_ref()
        } else {
            None
        };
        can_access_route(user, path)
    }

    // ===== Lifecycle =====

    /// Reconciles storage, then loads the persisted session. Must run before
    /// auth-dependent requests.
    pub fn hydrate(&self) -> Session {
        let outcome = match self.reconcile() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Session reconciliation failed: {:#}", e);
                Reconciliation::Discarded
            }
        };

        let persisted = self.auth.persisted_session();
        let usable = is_usable(&persisted);
        self.state.send_modify(|state| {
            state.persisted = if usable {
                persisted
            } else {
                PersistedSession::default()
            };
            state.runtime = SessionRuntime {
                status: if usable {
                    SessionStatus::Authenticated
                } else {
                    SessionStatus::Anonymous
                },
                hydrated: true,
                error: None,
            };
        });

        let session = self.snapshot();
        info!(
            "Session hydrated ({:?}); authenticated: {}",
            outcome, session.is_authenticated
        );
        session
    }

    /// Brings the namespaced blob and the legacy `token`/`user` keys back in
    /// line. The blob wins when both are usable.
    pub fn reconcile(&self) -> anyhow::Result<Reconciliation> {
        let persistence = SessionPersistence::new(self.auth.storage().as_ref());
        let blob = persistence.load_blob();
        let legacy = persistence.load_legacy();
        let present = |s: &PersistedSession| {
            s.user.is_some() && s.token.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
        };

        let outcome = if present(&blob) {
            if !is_usable(&blob) {
                persistence.clear()?;
                Reconciliation::Expired
            } else if blob != legacy {
                persistence.save_legacy(&blob)?;
                Reconciliation::LegacyRewritten
            } else {
                Reconciliation::Consistent
            }
        } else if present(&legacy) {
            if !is_usable(&legacy) {
                persistence.clear()?;
                Reconciliation::Expired
            } else {
                persistence.save(&legacy)?;
                Reconciliation::BlobRebuilt
            }
        } else if !blob.is_empty() || !legacy.is_empty() {
            persistence.clear()?;
            Reconciliation::Discarded
        } else {
            Reconciliation::Empty
        };

        if outcome != Reconciliation::Empty && outcome != Reconciliation::Consistent {
            warn!("Persisted session drift corrected: {:?}", outcome);
        }
        Ok(outcome)
    }

    /// Forces a logout when the stored token has expired. Returns whether a
    /// usable session remains.
    pub fn validate_session(&self) -> bool {
        match self.auth.expire_if_invalid() {
            Ok(true) => false,
            Ok(false) => self.is_authenticated(),
            Err(e) => {
                error!("Failed to clear expired session: {:#}", e);
                self.logout();
                false
            }
        }
    }

    // ===== Actions =====

    pub async fn login(&self, username: &str, password: &str) -> ApiResponse<User> {
        self.begin();
        info!("Logging in as {}", username);

        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: ApiResponse<Value> = self.client.post(LOGIN_ENDPOINT, &body).await;

        match extract_token(response) {
            Ok(token) => self.complete_with_token(token).await,
            Err(failure) => self.fail(failure),
        }
    }

    pub async fn register(&self, data: RegisterRequest) -> ApiResponse<User> {
        self.begin();
        info!("Registering {} as {}", data.username, data.role.as_str());

        let response: ApiResponse<Value> = self.client.post(REGISTER_ENDPOINT, &data).await;
        if !response.success {
            return self.fail(response);
        }

        // Some deployments answer with a ready session token.
        if let Some(Value::String(token)) = &response.data {
            let token = token.trim().trim_matches('"').to_string();
            if is_valid_token(&token) {
                return self.complete_with_token(token).await;
            }
        }

        let response: ApiResponse<Value> = self
            .client
            .post(
                LOGIN_ENDPOINT,
                &LoginRequest {
                    username: data.username.clone(),
                    password: data.password.clone(),
                },
            )
            .await;
        match extract_token(response) {
            Ok(token) => self.complete_with_token(token).await,
            Err(failure) => self.fail(failure),
        }
    }

    /// Local only: tokens are stateless, nothing to revoke server-side.
    pub fn logout(&self) {
        self.state.send_modify(|state| {
            state.persisted = PersistedSession::default();
            state.runtime.status = SessionStatus::Anonymous;
            state.runtime.error = None;
        });
        if let Err(e) = self.auth.clear_auth() {
            error!("Failed to clear persisted session: {:#}", e);
        }
        info!("Logged out");
    }

    /// Shallow-merges into the current user; no-op when logged out.
    pub fn update_user(&self, update: UserUpdate) -> Option<User> {
        let mut merged = None;
        self.state.send_if_modified(|state| match state.persisted.user.as_mut() {
            Some(user) => {
                user.merge(update);
                merged = Some(state.persisted.clone());
                true
            }
            None => false,
        });

        let session = merged?;
        if let Err(e) = SessionPersistence::new(self.auth.storage().as_ref()).save(&session) {
            error!("Failed to persist updated user: {:#}", e);
        }
        session.user
    }

    /// Re-reads `/users/profile` and replaces the cached user.
    pub async fn refresh_user(&self) -> ApiResponse<User> {
        let response: ApiResponse<User> = self.client.get(PROFILE_ENDPOINT).await;
        let Some(user) = response.data.clone().filter(|_| response.success) else {
            let message = failure_message(&response);
            self.state
                .send_modify(|state| state.runtime.error = Some(message.clone()));
            let failed = ApiResponse::failure(message);
            return match response.status {
                Some(status) => failed.with_status(status),
                None => failed,
            };
        };

        let mut updated = None;
        self.state.send_if_modified(|state| {
            if state.persisted.token.is_none() {
                return false;
            }
            state.persisted.user = Some(user.clone());
            state.runtime.error = None;
            updated = Some(state.persisted.clone());
            true
        });
        if let Some(session) = updated {
            if let Err(e) = SessionPersistence::new(self.auth.storage().as_ref()).save(&session) {
                error!("Failed to persist refreshed user: {:#}", e);
            }
        }
        ApiResponse::ok(user)
    }

    // ===== Internals =====

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.runtime.status = SessionStatus::Authenticating;
            state.runtime.error = None;
        });
    }

    async fn complete_with_token(&self, token: String) -> ApiResponse<User> {
        if !is_valid_token(&token) {
            warn!("Backend issued an unreadable or expired token");
            return self.fail(ApiResponse::<()>::failure("Received an invalid session token"));
        }

        let response: ApiResponse<User> = self
            .client
            .request(PROFILE_ENDPOINT, RequestOptions::get().with_token(token.clone()))
            .await;
        let user = match response.data.clone().filter(|_| response.success) {
            Some(user) => user,
            None => return self.fail(response),
        };

        if let Err(e) = self.auth.set_auth(&token, &user) {
            error!("Failed to persist session: {:#}", e);
            return self.fail(ApiResponse::<()>::failure("Could not save your session"));
        }

        self.state.send_modify(|state| {
            state.persisted = PersistedSession {
                user: Some(user.clone()),
                token: Some(token.clone()),
            };
            state.runtime.status = SessionStatus::Authenticated;
            state.runtime.error = None;
        });
        info!("Authenticated as {}", user.username);
        ApiResponse::ok(user)
    }

    fn fail<T, U>(&self, response: ApiResponse<T>) -> ApiResponse<U> {
        let message = failure_message(&response);
        warn!("Authentication failed: {}", message);
        // A failed attempt leaves any stored session in place.
        let persisted = self.auth.persisted_session();
        let usable = is_usable(&persisted);
        self.state.send_modify(|state| {
            if usable {
                state.persisted = persisted;
                state.runtime.status = SessionStatus::Authenticated;
            } else {
                state.persisted = PersistedSession::default();
                state.runtime.status = SessionStatus::Anonymous;
            }
            state.runtime.error = Some(message.clone());
        });
        let failed = ApiResponse::failure(message);
        match response.status {
            Some(status) => failed.with_status(status),
            None => failed,
        }
    }

    fn sync_from_storage(&self) {
        let persisted = self.auth.persisted_session();
        let usable = is_usable(&persisted);
        self.state.send_if_modified(|state| {
            let before = state.clone();
            if usable {
                state.persisted = persisted;
                state.runtime.status = SessionStatus::Authenticated;
            } else {
                state.persisted = PersistedSession::default();
                if state.runtime.status == SessionStatus::Authenticated {
                    state.runtime.status = SessionStatus::Anonymous;
                }
            }
            *state != before
        });
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        let id = self
            .listener
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(id) = id {
            self.auth.remove_listener(id);
        }
    }
}

/// The login endpoint answers with the bare token as text; JSON bodies
/// carrying `token` / `accessToken` are accepted too.
fn extract_token(response: ApiResponse<Value>) -> Result<String, ApiResponse<Value>> {
    if !response.success {
        return Err(response);
    }

    let token = match &response.data {
        Some(Value::String(text)) => Some(text.trim().trim_matches('"').to_string()),
        Some(Value::Object(object)) => ["token", "accessToken", "jwt"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    };

    match token.filter(|token| !token.is_empty()) {
        Some(token) => Ok(token),
        None => Err(ApiResponse::failure("Login response did not contain a token")
            .with_message(response.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{MemoryStorage, Storage, LEGACY_TOKEN_KEY, LEGACY_USER_KEY, SESSION_KEY};
    use crate::testutil::{sample_user, token_expiring_in, ScriptedTransport};
    use crate::types::Role;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        storage: Arc<MemoryStorage>,
        auth: Arc<AuthManager>,
        store: Arc<SessionStore>,
    }

    fn harness_with(storage: Arc<MemoryStorage>) -> Harness {
        let transport = ScriptedTransport::new();
        let auth = Arc::new(AuthManager::new(storage.clone()));
        let client = ApiClient::new("http://api.test", transport.clone(), storage.clone());
        let store = SessionStore::new(client, auth.clone());
        Harness {
            transport,
            storage,
            auth,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MemoryStorage::new()))
    }

    fn user_json() -> Value {
        serde_json::to_value(sample_user()).unwrap()
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let h = harness();
        let token = token_expiring_in(3600);
        h.transport.push_text(200, &token);
        h.transport.push_json(200, user_json());

        let response = h.store.login("jdoe", "secret").await;

        assert!(response.success);
        assert!(h.store.is_authenticated());
        assert_eq!(h.store.state().runtime.status, SessionStatus::Authenticated);
        assert!(h.auth.is_authenticated());

        let requests = h.transport.requests();
        assert_eq!(requests[0].url, "http://api.test/users/login");
        assert_eq!(requests[0].header("Authorization"), None);
        assert_eq!(
            requests[1].header("Authorization"),
            Some(format!("Bearer {}", token).as_str())
        );
    }

    #[tokio::test]
    async fn test_session_round_trips_through_storage() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;

        // a fresh process over the same storage
        let fresh = harness_with(h.storage.clone());
        assert!(fresh.store.is_loading());
        let session = fresh.store.hydrate();

        assert!(!fresh.store.is_loading());
        assert!(session.is_authenticated);
        assert_eq!(session.user, Some(sample_user()));
    }

    #[tokio::test]
    async fn test_login_failure_stays_anonymous() {
        let h = harness();
        h.store.hydrate();
        h.transport
            .push_json(401, serde_json::json!({"message": "Bad credentials"}));

        let response = h.store.login("jdoe", "wrong").await;

        assert!(!response.success);
        assert_eq!(response.status, Some(401));
        assert!(!h.store.is_authenticated());
        assert_eq!(h.store.state().runtime.status, SessionStatus::Anonymous);
        assert!(h.store.error().is_some());
        assert!(h.storage.get(SESSION_KEY).is_none());
    }

    #[tokio::test]
    async fn test_failed_relogin_keeps_existing_session() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        assert!(h.store.login("jdoe", "secret").await.success);

        h.transport
            .push_json(401, serde_json::json!({"message": "Bad credentials"}));
        let response = h.store.login("other", "wrong").await;

        assert!(!response.success);
        assert!(h.auth.is_authenticated());
        assert!(h.store.is_authenticated());
        assert_eq!(h.store.state().runtime.status, SessionStatus::Authenticated);
        assert_eq!(h.store.user(), Some(sample_user()));
        assert!(h.store.error().is_some());
    }

    #[tokio::test]
    async fn test_refresh_user_network_failure_has_no_status() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;

        h.transport.push_network_error("connection refused");
        let response = h.store.refresh_user().await;

        assert!(!response.success);
        assert_eq!(response.status, None);
        assert!(h.store.error().is_some());
        assert_eq!(h.store.user(), Some(sample_user()));
    }

    #[tokio::test]
    async fn test_login_rejects_expired_token() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(-5));

        let response = h.store.login("jdoe", "secret").await;

        assert!(!response.success);
        assert!(!h.store.is_authenticated());
        assert_eq!(h.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_login_accepts_json_token() {
        let h = harness();
        h.transport
            .push_json(200, serde_json::json!({"token": token_expiring_in(600)}));
        h.transport.push_json(200, user_json());

        assert!(h.store.login("jdoe", "secret").await.success);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let h = harness();
        h.transport.push_json(201, user_json());
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());

        let response = h
            .store
            .register(RegisterRequest {
                username: "jdoe".to_string(),
                email: "jdoe@example.test".to_string(),
                password: "secret".to_string(),
                role: Role::JobSeeker,
                first_name: None,
                last_name: None,
                company_name: None,
            })
            .await;

        assert!(response.success);
        assert!(h.store.is_authenticated());
        let urls: Vec<String> = h.transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://api.test/users/register",
                "http://api.test/users/login",
                "http://api.test/users/profile"
            ]
        );
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let h = harness();
        h.transport
            .push_json(409, serde_json::json!({"error": "Username already taken"}));

        let response = h
            .store
            .register(RegisterRequest {
                username: "jdoe".to_string(),
                email: "jdoe@example.test".to_string(),
                password: "secret".to_string(),
                role: Role::Employer,
                first_name: None,
                last_name: None,
                company_name: Some("Acme".to_string()),
            })
            .await;

        assert_eq!(response.error.as_deref(), Some("Username already taken"));
        assert!(!h.store.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_and_notifies_once() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;

        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        h.auth.add_listener(move || *counter.lock().unwrap() += 1);

        h.store.logout();

        assert!(!h.store.is_authenticated());
        assert!(!h.auth.is_authenticated());
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(h.storage.get(LEGACY_TOKEN_KEY).is_none());
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_band_clear_resets_store() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;
        let mut updates = h.store.subscribe();
        updates.borrow_and_update();

        h.auth.clear_auth().unwrap();

        assert!(updates.has_changed().unwrap());
        assert!(!h.store.is_authenticated());
        assert_eq!(h.store.state().runtime.status, SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_update_user_merges_and_persists() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;

        let updated = h
            .store
            .update_user(UserUpdate {
                contact_phone: Some("+41 00 000 00 00".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.contact_phone.as_deref(), Some("+41 00 000 00 00"));
        assert_eq!(updated.email, sample_user().email);
        let stored = h.auth.persisted_session().user.unwrap();
        assert_eq!(stored, updated);
        let legacy: User =
            serde_json::from_str(&h.storage.get(LEGACY_USER_KEY).unwrap()).unwrap();
        assert_eq!(legacy, updated);
    }

    #[test]
    fn test_update_user_without_session_is_noop() {
        let h = harness();
        h.store.hydrate();

        assert_eq!(h.store.update_user(UserUpdate::default()), None);
        assert!(h.storage.get(SESSION_KEY).is_none());
    }

    #[test]
    fn test_hydrate_rebuilds_blob_from_legacy_keys() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(LEGACY_TOKEN_KEY, &token_expiring_in(3600)).unwrap();
        storage
            .set(LEGACY_USER_KEY, &serde_json::to_string(&sample_user()).unwrap())
            .unwrap();
        let h = harness_with(storage);

        assert_eq!(h.store.reconcile().unwrap(), Reconciliation::BlobRebuilt);
        let session = h.store.hydrate();

        assert!(session.is_authenticated);
        assert!(h.storage.get(SESSION_KEY).is_some());
    }

    #[test]
    fn test_hydrate_rewrites_drifted_legacy_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let h = harness_with(storage);
        let token = token_expiring_in(3600);
        SessionPersistence::new(h.storage.as_ref())
            .save(&PersistedSession {
                user: Some(sample_user()),
                token: Some(token.clone()),
            })
            .unwrap();
        h.storage.set(LEGACY_TOKEN_KEY, "stale.token.value").unwrap();

        assert_eq!(h.store.reconcile().unwrap(), Reconciliation::LegacyRewritten);
        assert_eq!(h.storage.get(LEGACY_TOKEN_KEY), Some(token));
        assert_eq!(h.store.reconcile().unwrap(), Reconciliation::Consistent);
    }

    #[test]
    fn test_hydrate_drops_expired_session() {
        let h = harness();
        SessionPersistence::new(h.storage.as_ref())
            .save(&PersistedSession {
                user: Some(sample_user()),
                token: Some(token_expiring_in(-60)),
            })
            .unwrap();

        let session = h.store.hydrate();

        assert!(!session.is_authenticated);
        assert!(h.storage.get(SESSION_KEY).is_none());
        assert!(h.storage.get(LEGACY_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_refresh_user_replaces_cached_user() {
        let h = harness();
        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;

        let mut renamed = sample_user();
        renamed.first_name = Some("Janet".to_string());
        h.transport
            .push_json(200, serde_json::to_value(&renamed).unwrap());

        assert!(h.store.refresh_user().await.success);
        assert_eq!(h.store.user(), Some(renamed.clone()));
        assert_eq!(h.auth.persisted_session().user, Some(renamed));
    }

    #[tokio::test]
    async fn test_route_guard_uses_session() {
        let h = harness();
        h.store.hydrate();
        assert!(!h.store.can_access("/dashboard"));
        assert!(!h.store.can(Permission::CanApplyToJobs));

        h.transport.push_text(200, &token_expiring_in(3600));
        h.transport.push_json(200, user_json());
        h.store.login("jdoe", "secret").await;

        assert!(h.store.can_access("/dashboard"));
        assert!(!h.store.can_access("/jobs/create"));
        assert!(h.store.can(Permission::CanApplyToJobs));
    }

    #[test]
    fn test_drop_unregisters_listener() {
        let h = harness();
        assert_eq!(h.auth.listener_count(), 1);
        drop(h.store);
        assert_eq!(h.auth.listener_count(), 0);
    }
}
