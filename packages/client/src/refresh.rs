//! Debounced, single-flight refresh of both collections.
//!
//! [`RefreshScheduler::request_refresh`] restarts a quiet-window timer on
//! every call, so a burst of requests yields one cycle that starts a quiet
//! window after the last call. Cycles never overlap: a timer that fires while
//! a cycle is running waits for it, and at most one such follow-up is queued.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::auth::AuthSession;
use crate::resource_store::{BookmarkStore, NoteStore};

/// One unit of refresh work.
pub trait RefreshCycle: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = ()> + Send;
}

struct SchedulerInner<C> {
    cycle: C,
    quiet_window: Duration,
    /// Timer still inside its quiet window, tagged with its request number.
    pending: Mutex<Option<(u64, JoinHandle<()>)>>,
    requests: AtomicU64,
    /// Bumped by `cancel`; a fired timer from an older epoch does nothing.
    epoch: AtomicU64,
    /// Epoch + 1 of the follow-up waiting behind the running cycle, 0 if none.
    queued: AtomicU64,
    in_flight: tokio::sync::Mutex<()>,
    completed: AtomicU64,
}

pub struct RefreshScheduler<C: RefreshCycle> {
    inner: Arc<SchedulerInner<C>>,
}

impl<C: RefreshCycle> RefreshScheduler<C> {
    pub fn new(cycle: C, quiet_window: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                cycle,
                quiet_window,
                pending: Mutex::new(None),
                requests: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                queued: AtomicU64::new(0),
                in_flight: tokio::sync::Mutex::new(()),
                completed: AtomicU64::new(0),
            }),
        }
    }

    /// Schedule a cycle one quiet window from now, superseding any timer
    /// that has not fired yet. Must be called within a Tokio runtime.
    pub fn request_refresh(&self) {
        let mut pending = self.inner.pending.lock();
        if let Some((_, timer)) = pending.take() {
            timer.abort();
        }

        let request = self.inner.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.quiet_window).await;
            fire(inner, request, epoch).await;
        });
        *pending = Some((request, timer));
    }

    /// Drop the pending timer and any follow-up waiting behind a running
    /// cycle. A cycle already running is left to finish.
    pub fn cancel(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some((request, timer)) = self.inner.pending.lock().take() {
            debug!(request, "refresh canceled");
            timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn cycle(&self) -> &C {
        &self.inner.cycle
    }
}

impl<C: RefreshCycle> Drop for RefreshScheduler<C> {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn fire<C: RefreshCycle>(inner: Arc<SchedulerInner<C>>, request: u64, epoch: u64) {
    {
        let mut pending = inner.pending.lock();
        match pending.as_ref() {
            Some((current, _)) if *current == request => *pending = None,
            _ => return,
        }
    }

    // A follow-up queued before a cancel does not block one from after it.
    let slot = epoch + 1;
    if inner.queued.fetch_max(slot, Ordering::SeqCst) >= slot {
        debug!(request, "refresh already queued behind the running cycle");
        return;
    }
    let _running = inner.in_flight.lock().await;
    let _ = inner
        .queued
        .compare_exchange(slot, 0, Ordering::SeqCst, Ordering::SeqCst);

    if inner.epoch.load(Ordering::SeqCst) != epoch {
        debug!(request, "refresh canceled while queued");
        return;
    }

    debug!(request, "refresh cycle started");
    inner.cycle.run().await;
    let completed = inner.completed.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(request, completed, "refresh cycle finished");
}

/// Notes, then a pause, then bookmarks.
pub struct SyncCycle {
    notes: Arc<NoteStore>,
    bookmarks: Arc<BookmarkStore>,
    session: AuthSession,
    inter_fetch_delay: Duration,
}

impl SyncCycle {
    pub fn new(
        notes: Arc<NoteStore>,
        bookmarks: Arc<BookmarkStore>,
        session: AuthSession,
        inter_fetch_delay: Duration,
    ) -> Self {
        Self {
            notes,
            bookmarks,
            session,
            inter_fetch_delay,
        }
    }
}

impl RefreshCycle for SyncCycle {
    fn run(&self) -> impl Future<Output = ()> + Send {
        async move {
            if !self.session.is_authenticated() {
                debug!("no session, skipping refresh");
                return;
            }
            if let Err(e) = self.notes.list().await {
                debug!(error = %e, "notes refresh failed");
            }

            tokio::time::sleep(self.inter_fetch_delay).await;

            if !self.session.is_authenticated() {
                debug!("session ended between fetches");
                return;
            }
            if let Err(e) = self.bookmarks.list().await {
                debug!(error = %e, "bookmarks refresh failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{sleep, Instant};

    #[derive(Default)]
    struct Stats {
        started: parking_lot::Mutex<Vec<Instant>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    struct TestCycle {
        stats: Arc<Stats>,
        work: Duration,
    }

    impl RefreshCycle for TestCycle {
        fn run(&self) -> impl Future<Output = ()> + Send {
            async move {
                self.stats.started.lock().push(Instant::now());
                let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.stats.max_active.fetch_max(active, Ordering::SeqCst);
                sleep(self.work).await;
                self.stats.active.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    fn scheduler(work: Duration) -> (RefreshScheduler<TestCycle>, Arc<Stats>) {
        let stats = Arc::new(Stats::default());
        let cycle = TestCycle {
            stats: Arc::clone(&stats),
            work,
        };
        (RefreshScheduler::new(cycle, Duration::from_millis(300)), stats)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_one_cycle_after_last_call() {
        let (scheduler, stats) = scheduler(Duration::ZERO);
        let start = Instant::now();

        for _ in 0..5 {
            scheduler.request_refresh();
            sleep(Duration::from_millis(100)).await;
        }
        // Last call happened at t=400ms
        assert!(scheduler.is_pending());
        sleep(Duration::from_secs(2)).await;

        let started = stats.started.lock().clone();
        assert_eq!(started.len(), 1);
        let offset = started[0] - start;
        assert!(offset >= Duration::from_millis(700), "{offset:?}");
        assert!(offset < Duration::from_millis(800), "{offset:?}");
        assert_eq!(scheduler.completed_cycles(), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_refresh() {
        let (scheduler, stats) = scheduler(Duration::ZERO);
        scheduler.request_refresh();
        sleep(Duration::from_millis(100)).await;
        scheduler.cancel();
        sleep(Duration::from_secs(1)).await;

        assert!(stats.started.lock().is_empty());
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_during_cycle_queue_one_follow_up() {
        let (scheduler, stats) = scheduler(Duration::from_secs(1));

        scheduler.request_refresh();
        // First cycle runs from 300ms to 1300ms
        sleep(Duration::from_millis(400)).await;
        scheduler.request_refresh();
        sleep(Duration::from_millis(500)).await;
        scheduler.request_refresh();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(stats.started.lock().len(), 2);
        assert_eq!(stats.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.completed_cycles(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_queued_follow_up() {
        let (scheduler, stats) = scheduler(Duration::from_secs(1));

        scheduler.request_refresh();
        sleep(Duration::from_millis(400)).await;
        scheduler.request_refresh();
        // Second timer fires at 700ms and waits for the running cycle
        sleep(Duration::from_millis(400)).await;
        scheduler.cancel();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(stats.started.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_after_cancel_replaces_stale_follow_up() {
        let (scheduler, stats) = scheduler(Duration::from_secs(3));

        scheduler.request_refresh();
        // First cycle runs from 300ms to 3300ms
        sleep(Duration::from_millis(400)).await;
        scheduler.request_refresh();
        // Follow-up fired at 700ms and waits; the session restarts at 800ms
        sleep(Duration::from_millis(400)).await;
        scheduler.cancel();
        scheduler.request_refresh();
        sleep(Duration::from_secs(20)).await;

        let started = stats.started.lock().clone();
        assert_eq!(started.len(), 2);
        assert_eq!(stats.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.completed_cycles(), 2);
    }
}
