//! # Client crate: data synchronization for notes & bookmarks
//!
//! Sits between a UI and the REST backend. The UI reads collection
//! snapshots and session state, calls store operations, and renders the
//! views and notifications this crate produces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | [`AuthSession`]: credential lifecycle and header material |
//! | [`resource_store`] | [`ResourceStore`]: write-then-refetch cache of one collection |
//! | [`refresh`] | [`RefreshScheduler`]: debounced, single-flight refresh of both stores |
//! | [`view`] | Pure filter and sort projections |
//! | [`activity_log`] | [`ActivityLog`]: user-facing notifications |
//! | [`settings`] | [`Settings`] from defaults, `notemark.toml` and `NOTEMARK_*` |
//! | [`provider`] | [`DataProvider`]: composition root |

pub mod activity_log;
pub mod auth;
pub mod provider;
pub mod refresh;
pub mod resource_store;
pub mod settings;
pub mod view;

pub use activity_log::{ActivityLog, LogEntry, LogLevel};
pub use auth::{AuthSession, AuthState, SessionStatus};
pub use provider::DataProvider;
pub use refresh::{RefreshCycle, RefreshScheduler, SyncCycle};
pub use resource_store::{BookmarkStore, NoteStore, ResourceStore};
pub use settings::{Settings, SyncTimings, SETTINGS_FILE};
pub use view::{NoteSort, SortDirection, SortKey, ViewCriteria};
