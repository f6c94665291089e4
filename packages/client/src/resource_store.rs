//! In-memory, server-authoritative cache of one resource collection.
//!
//! A store never edits its collection locally. Every successful write is
//! followed, after the settle delay, by a full re-fetch, and the fetched
//! collection replaces the held one in a single `watch` send. Writes against
//! one store are queued behind a mutex so a double submit cannot race.
//! Fetches are numbered when issued; one that lands after a newer fetch has
//! been applied is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use api::{ApiClient, ApiError, ApiResult, RetryPolicy};
use store::{FavoriteChange, Resource, ResourceKind};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::activity_log::ActivityLog;
use crate::auth::AuthSession;
use crate::settings::SyncTimings;

pub type NoteStore = ResourceStore<store::Note>;
pub type BookmarkStore = ResourceStore<store::Bookmark>;

pub struct ResourceStore<R: Resource> {
    api: ApiClient,
    session: AuthSession,
    log: ActivityLog,
    retry: RetryPolicy,
    settle_delay: Duration,
    items: watch::Sender<Vec<R>>,
    loading: watch::Sender<bool>,
    active_fetches: parking_lot::Mutex<usize>,
    issued: AtomicU64,
    applied: AtomicU64,
    mutations: Mutex<()>,
}

/// Holds the loading flag up while at least one fetch is in flight.
struct FetchGuard<'a> {
    active: &'a parking_lot::Mutex<usize>,
    loading: &'a watch::Sender<bool>,
}

impl<'a> FetchGuard<'a> {
    fn begin(active: &'a parking_lot::Mutex<usize>, loading: &'a watch::Sender<bool>) -> Self {
        let mut count = active.lock();
        *count += 1;
        loading.send_if_modified(|flag| !std::mem::replace(flag, true));
        Self { active, loading }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut count = self.active.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.loading.send_if_modified(|flag| std::mem::replace(flag, false));
        }
    }
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(
        api: ApiClient,
        session: AuthSession,
        log: ActivityLog,
        timings: &SyncTimings,
    ) -> Self {
        let (items, _) = watch::channel(Vec::new());
        let (loading, _) = watch::channel(false);
        Self {
            api,
            session,
            log,
            retry: timings.retry,
            settle_delay: timings.settle_delay,
            items,
            loading,
            active_fetches: parking_lot::Mutex::new(0),
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            mutations: Mutex::new(()),
        }
    }

    /// Snapshot of the collection as of the last successful fetch.
    pub fn items(&self) -> Vec<R> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<R>> {
        self.items.subscribe()
    }

    pub fn loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn clear(&self) {
        self.items.send_if_modified(|items| {
            if items.is_empty() {
                return false;
            }
            items.clear();
            true
        });
    }

    /// Fetch the full collection and replace the held one.
    ///
    /// Without a credential no request is sent. A failure leaves the prior
    /// collection intact, and so does a fetch overtaken by a newer one.
    pub async fn list(&self) -> ApiResult<()> {
        if !self.session.is_authenticated() {
            debug!(kind = R::KIND.label(), "skipping fetch without a session");
            return Err(ApiError::NotAuthenticated);
        }

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let headers = self.session.headers();
        let result = {
            let _fetching = FetchGuard::begin(&self.active_fetches, &self.loading);
            self.retry.run(|| self.api.list::<R>(&headers)).await
        };

        match result {
            Ok(items) => {
                // The session may have ended while the request was in flight.
                if !self.session.is_authenticated() {
                    debug!(kind = R::KIND.label(), "discarding fetch for ended session");
                    return Err(ApiError::NotAuthenticated);
                }
                let count = items.len();
                // The watch lock orders concurrent completions.
                let applied = self.items.send_if_modified(|held| {
                    if seq <= self.applied.load(Ordering::SeqCst) {
                        return false;
                    }
                    self.applied.store(seq, Ordering::SeqCst);
                    *held = items;
                    true
                });
                if applied {
                    debug!(kind = R::KIND.label(), seq, count, "collection fetched");
                } else {
                    debug!(kind = R::KIND.label(), seq, "discarding overtaken fetch");
                }
                Ok(())
            }
            Err(e) => {
                error!(kind = R::KIND.label(), error = %e, "fetch failed");
                if e.status() == Some(401) {
                    self.session.invalidate();
                }
                let fallback = format!("Failed to load {}s", R::KIND.label());
                self.log.error(e.user_message(&fallback));
                Err(e)
            }
        }
    }

    pub async fn create(&self, draft: &R::Draft) -> ApiResult<()> {
        let fallback = format!("Failed to create {}", R::KIND.label());
        let payload = self.validate(draft)?;

        let _queued = self.mutations.lock().await;
        let headers = self.authorized(&fallback)?;
        let result = self
            .retry
            .run(|| self.api.create::<R>(&headers, &payload))
            .await;

        let success = format!("{} created successfully!", R::KIND.title());
        self.settle(result, &success, &fallback).await
    }

    /// Replace the selected resource's fields. Returns `Ok(false)` without
    /// touching the network when nothing is selected.
    pub async fn update(&self, selected: Option<&str>, draft: &R::Draft) -> ApiResult<bool> {
        let Some(id) = selected.filter(|id| !id.is_empty()) else {
            debug!(kind = R::KIND.label(), "update without a selection");
            return Ok(false);
        };
        let fallback = format!("Failed to update {}", R::KIND.label());
        let payload = self.validate(draft)?;

        let _queued = self.mutations.lock().await;
        let headers = self.authorized(&fallback)?;
        let result = self
            .retry
            .run(|| self.api.update::<R>(&headers, id, &payload))
            .await;

        let success = format!("{} updated successfully!", R::KIND.title());
        self.settle(result, &success, &fallback).await?;
        Ok(true)
    }

    /// Delete by id. Confirmation is the caller's job.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let fallback = format!("Failed to delete {}", R::KIND.label());

        let _queued = self.mutations.lock().await;
        let headers = self.authorized(&fallback)?;
        let result = self.retry.run(|| self.api.delete::<R>(&headers, id)).await;

        let success = format!("{} deleted successfully!", R::KIND.title());
        self.settle(result, &success, &fallback).await
    }

    pub async fn toggle_favorite(&self, resource: &R) -> ApiResult<()> {
        let fallback = match R::KIND {
            ResourceKind::Note => "Failed to update favorite status",
            ResourceKind::Bookmark => "Failed to update favorite",
        };

        let _queued = self.mutations.lock().await;
        let headers = self.authorized(fallback)?;
        let change = resource.favorite_change();
        let (api, headers, change, id) = (&self.api, &headers, &change, resource.id());
        let result = self
            .retry
            .run(|| async move {
                match change {
                    FavoriteChange::Flag(value) => {
                        api.set_favorite::<R>(headers, id, *value).await
                    }
                    FavoriteChange::Replace(payload) => {
                        api.update::<R>(headers, id, payload).await
                    }
                }
            })
            .await;

        let success = if resource.is_favorite() {
            "Removed from favorites"
        } else {
            "Added to favorites"
        };
        self.settle(result, success, fallback).await
    }

    fn validate(&self, draft: &R::Draft) -> ApiResult<R::Payload> {
        R::validate(draft).map_err(|e| {
            warn!(kind = R::KIND.label(), error = %e, "rejected draft");
            self.log.error(e.to_string());
            ApiError::Validation(e)
        })
    }

    fn authorized(&self, fallback: &str) -> ApiResult<api::HeaderMap> {
        if self.session.is_authenticated() {
            return Ok(self.session.headers());
        }
        let e = ApiError::NotAuthenticated;
        self.log.error(e.user_message(fallback));
        Err(e)
    }

    /// Report a write's outcome and, on success, re-fetch once the backend
    /// has settled. The write's own result is returned; a failed re-fetch
    /// reports itself.
    async fn settle(
        &self,
        result: ApiResult<()>,
        success: &str,
        fallback: &str,
    ) -> ApiResult<()> {
        match result {
            Ok(()) => {
                info!(kind = R::KIND.label(), "{success}");
                self.log.success(success);
                tokio::time::sleep(self.settle_delay).await;
                if let Err(e) = self.list().await {
                    debug!(kind = R::KIND.label(), error = %e, "re-fetch after write failed");
                }
                Ok(())
            }
            Err(e) => {
                error!(kind = R::KIND.label(), error = %e, "{fallback}");
                self.log.error(e.user_message(fallback));
                Err(e)
            }
        }
    }
}
