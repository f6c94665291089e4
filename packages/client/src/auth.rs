//! Authentication session: the single owner of the bearer credential.
//!
//! [`AuthSession`] moves through `Uninitialized → Restoring → {Authenticated,
//! Anonymous}`. Readers observe it through [`AuthSession::subscribe`] and
//! never see the token itself, only [`AuthSession::headers`].

use std::sync::Arc;

use api::{
    request_headers, ApiClient, ApiResult, AuthResponse, HeaderMap, LoginRequest, RegisterRequest,
};
use parking_lot::RwLock;
use store::{SessionStorage, UserInfo, SESSION_TOKEN_KEY, SESSION_USER_KEY};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::activity_log::ActivityLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Restoring,
    Authenticated,
    Anonymous,
}

/// Snapshot of the session as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub status: SessionStatus,
    pub user: Option<UserInfo>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            user: None,
        }
    }
}

impl AuthState {
    /// True until restoration has finished.
    pub fn loading(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Uninitialized | SessionStatus::Restoring
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

struct Credential {
    token: String,
    user: UserInfo,
}

struct SessionInner {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    log: ActivityLog,
    credential: RwLock<Option<Credential>>,
    state: watch::Sender<AuthState>,
}

/// Cheaply cloneable handle; every clone shares the same session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

impl AuthSession {
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>, log: ActivityLog) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(SessionInner {
                api,
                storage,
                log,
                credential: RwLock::new(None),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.credential.read().is_some()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.inner
            .credential
            .read()
            .as_ref()
            .map(|credential| credential.user.clone())
    }

    /// Header material for an outbound call. Carries the bearer token only
    /// while authenticated.
    pub fn headers(&self) -> HeaderMap {
        let credential = self.inner.credential.read();
        request_headers(credential.as_ref().map(|c| c.token.as_str()))
    }

    /// Load a previously persisted credential. Both keys must be present and
    /// the user record must decode, otherwise the session is anonymous and
    /// any leftover key is removed.
    pub fn restore(&self) -> AuthState {
        self.set_status(SessionStatus::Restoring, None);

        let storage = &self.inner.storage;
        let restored = match (storage.get(SESSION_TOKEN_KEY), storage.get(SESSION_USER_KEY)) {
            (Some(token), Some(user)) => match serde_json::from_str::<UserInfo>(&user) {
                Ok(user) => Some(Credential { token, user }),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable stored user");
                    None
                }
            },
            _ => None,
        };

        match restored {
            Some(credential) => {
                debug!(user = %credential.user.username, "restored session");
                let user = credential.user.clone();
                *self.inner.credential.write() = Some(credential);
                self.set_status(SessionStatus::Authenticated, Some(user));
            }
            None => {
                storage.remove(SESSION_TOKEN_KEY);
                storage.remove(SESSION_USER_KEY);
                *self.inner.credential.write() = None;
                self.set_status(SessionStatus::Anonymous, None);
            }
        }
        self.state()
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserInfo> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let result = self.inner.api.login(&request).await;
        self.finish_auth(result, "Login successful!", "Login failed")
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<UserInfo> {
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.inner.api.register(&request).await;
        self.finish_auth(result, "Registration successful!", "Registration failed")
    }

    fn finish_auth(
        &self,
        result: ApiResult<AuthResponse>,
        success: &str,
        fallback: &str,
    ) -> ApiResult<UserInfo> {
        match result {
            Ok(AuthResponse { token, user }) => {
                self.establish(token, user.clone());
                info!(user = %user.username, "authenticated");
                self.inner.log.success(success);
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "{fallback}");
                self.inner.log.error(e.user_message(fallback));
                Err(e)
            }
        }
    }

    fn establish(&self, token: String, user: UserInfo) {
        let storage = &self.inner.storage;
        storage.set(SESSION_TOKEN_KEY, &token);
        match serde_json::to_string(&user) {
            Ok(json) => storage.set(SESSION_USER_KEY, &json),
            Err(e) => warn!(error = %e, "failed to persist user"),
        }
        *self.inner.credential.write() = Some(Credential {
            token,
            user: user.clone(),
        });
        self.set_status(SessionStatus::Authenticated, Some(user));
    }

    /// Drop the credential and its persisted copy. Safe to call repeatedly.
    pub fn logout(&self) {
        if self.clear() {
            self.inner.log.success("Logged out successfully!");
        }
    }

    /// Drop a credential the backend no longer accepts.
    pub fn invalidate(&self) {
        if self.clear() {
            self.inner
                .log
                .warning("Your session has expired. Please log in again.");
        }
    }

    /// Returns whether a credential was held.
    fn clear(&self) -> bool {
        let had_credential = self.inner.credential.write().take().is_some();
        self.inner.storage.remove(SESSION_TOKEN_KEY);
        self.inner.storage.remove(SESSION_USER_KEY);
        self.set_status(SessionStatus::Anonymous, None);
        if had_credential {
            info!("session cleared");
        }
        had_credential
    }

    fn set_status(&self, status: SessionStatus, user: Option<UserInfo>) {
        self.inner.state.send_if_modified(|state| {
            let next = AuthState { status, user };
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;

    fn session_with(storage: MemoryStore) -> AuthSession {
        let api = ApiClient::new("http://127.0.0.1:9/api").unwrap();
        AuthSession::new(api, Arc::new(storage), ActivityLog::new())
    }

    #[test]
    fn test_starts_uninitialized_and_loading() {
        let session = session_with(MemoryStore::new());
        let state = session.state();
        assert_eq!(state.status, SessionStatus::Uninitialized);
        assert!(state.loading());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_restore_without_keys_is_anonymous() {
        let session = session_with(MemoryStore::new());
        let state = session.restore();
        assert_eq!(state.status, SessionStatus::Anonymous);
        assert!(!state.loading());
        assert!(session.headers().get("authorization").is_none());
    }

    #[test]
    fn test_restore_with_both_keys() {
        let storage = MemoryStore::new();
        storage.set(SESSION_TOKEN_KEY, "t0ken");
        storage.set(SESSION_USER_KEY, r#"{"id":"u1","username":"ada"}"#);

        let session = session_with(storage);
        let state = session.restore();
        assert!(state.is_authenticated());
        assert_eq!(state.user.unwrap().username, "ada");
        assert_eq!(session.headers().get("authorization").unwrap(), "Bearer t0ken");
    }

    #[test]
    fn test_restore_with_only_token_is_anonymous() {
        let storage = MemoryStore::new();
        storage.set(SESSION_TOKEN_KEY, "t0ken");

        let session = session_with(storage.clone());
        assert_eq!(session.restore().status, SessionStatus::Anonymous);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_restore_with_corrupt_user_is_anonymous() {
        let storage = MemoryStore::new();
        storage.set(SESSION_TOKEN_KEY, "t0ken");
        storage.set(SESSION_USER_KEY, "{not json");

        let session = session_with(storage.clone());
        assert_eq!(session.restore().status, SessionStatus::Anonymous);
        assert!(storage.get(SESSION_USER_KEY).is_none());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let storage = MemoryStore::new();
        storage.set(SESSION_TOKEN_KEY, "t0ken");
        storage.set(SESSION_USER_KEY, r#"{"id":"u1","username":"ada"}"#);
        let log = ActivityLog::new();
        let api = ApiClient::new("http://127.0.0.1:9/api").unwrap();
        let session = AuthSession::new(api, Arc::new(storage.clone()), log.clone());
        session.restore();

        session.logout();
        session.logout();

        assert_eq!(session.state().status, SessionStatus::Anonymous);
        assert!(session.user().is_none());
        assert!(storage.is_empty());
        // Only the first call had something to log out of
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].message, "Logged out successfully!");
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let session = session_with(MemoryStore::new());
        let rx = session.subscribe();
        session.restore();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().status, SessionStatus::Anonymous);
    }
}
