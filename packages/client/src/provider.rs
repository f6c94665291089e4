use std::sync::Arc;

use api::{ApiClient, ApiResult};
use parking_lot::Mutex;
use store::{FileStore, SessionStorage, UserInfo};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::activity_log::ActivityLog;
use crate::auth::{AuthSession, AuthState};
use crate::refresh::{RefreshScheduler, SyncCycle};
use crate::resource_store::{BookmarkStore, NoteStore, ResourceStore};
use crate::settings::{Settings, SyncTimings};

/// Wires the session, both stores and the refresh scheduler together.
///
/// After [`start`](Self::start) a watcher follows the session: becoming
/// authenticated requests a refresh, losing the credential cancels any
/// pending refresh and empties both collections.
pub struct DataProvider {
    session: AuthSession,
    notes: Arc<NoteStore>,
    bookmarks: Arc<BookmarkStore>,
    scheduler: Arc<RefreshScheduler<SyncCycle>>,
    log: ActivityLog,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl DataProvider {
    /// Session persisted on disk under the configured directory.
    pub fn open(settings: &Settings) -> ApiResult<Self> {
        let storage = FileStore::new(settings.session_dir());
        info!(dir = %storage.base().display(), "using session directory");
        Self::new(settings, Arc::new(storage))
    }

    pub fn new(settings: &Settings, storage: Arc<dyn SessionStorage>) -> ApiResult<Self> {
        let api = ApiClient::with_timeout(&settings.api.base_url, settings.timeout())?;
        Ok(Self::with_client(api, storage, settings.timings()))
    }

    pub fn with_client(
        api: ApiClient,
        storage: Arc<dyn SessionStorage>,
        timings: SyncTimings,
    ) -> Self {
        let log = ActivityLog::new();
        let session = AuthSession::new(api.clone(), storage, log.clone());
        let notes = Arc::new(ResourceStore::new(
            api.clone(),
            session.clone(),
            log.clone(),
            &timings,
        ));
        let bookmarks = Arc::new(ResourceStore::new(
            api,
            session.clone(),
            log.clone(),
            &timings,
        ));
        let cycle = SyncCycle::new(
            Arc::clone(&notes),
            Arc::clone(&bookmarks),
            session.clone(),
            timings.inter_fetch_delay,
        );
        let scheduler = Arc::new(RefreshScheduler::new(cycle, timings.quiet_window));

        Self {
            session,
            notes,
            bookmarks,
            scheduler,
            log,
            watcher: Mutex::new(None),
        }
    }

    /// Restore the persisted session and begin following it. Must be called
    /// within a Tokio runtime.
    pub fn start(&self) -> AuthState {
        let state = self.session.restore();

        let mut rx = self.session.subscribe();
        let scheduler = Arc::clone(&self.scheduler);
        let notes = Arc::clone(&self.notes);
        let bookmarks = Arc::clone(&self.bookmarks);
        let watcher = tokio::spawn(async move {
            loop {
                let authenticated = rx.borrow_and_update().is_authenticated();
                if authenticated {
                    scheduler.request_refresh();
                } else {
                    scheduler.cancel();
                    notes.clear();
                    bookmarks.clear();
                }
                if rx.changed().await.is_err() {
                    debug!("session closed, watcher exiting");
                    break;
                }
            }
        });

        if let Some(previous) = self.watcher.lock().replace(watcher) {
            previous.abort();
        }
        state
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn scheduler(&self) -> &RefreshScheduler<SyncCycle> {
        &self.scheduler
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserInfo> {
        self.session.login(username, password).await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<UserInfo> {
        self.session.register(username, email, password).await
    }

    /// End the session. Collections are empty and no refresh is pending by
    /// the time this returns.
    pub fn logout(&self) {
        self.session.logout();
        self.scheduler.cancel();
        self.notes.clear();
        self.bookmarks.clear();
    }

    pub fn request_refresh(&self) {
        self.scheduler.request_refresh();
    }
}

impl Drop for DataProvider {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        self.scheduler.cancel();
    }
}
