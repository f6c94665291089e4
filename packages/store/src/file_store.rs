//! # Filesystem-backed session storage
//!
//! [`FileStore`] is a [`SessionStorage`] implementation that keeps one file per
//! key under a base directory, so a login survives process restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── token        # bearer token
//! └── user         # JSON-encoded UserInfo
//! ```
//!
//! ## Platform data directories
//!
//! [`FileStore::default_dir`] resolves `<data_dir>/notemark` via [`dirs::data_dir()`]:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS | `~/Library/Application Support/notemark/` |
//! | Linux | `~/.local/share/notemark/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\notemark\` |

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::session::SessionStorage;

/// Filesystem-backed SessionStorage for desktop persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// `<data_dir>/notemark`, or `./notemark` when no data dir is known.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notemark")
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

impl SessionStorage for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.base) {
            warn!(dir = %self.base.display(), error = %e, "failed to create session dir");
            return;
        }
        if let Err(e) = std::fs::write(self.key_path(key), value) {
            warn!(key, error = %e, "failed to persist session key");
        }
    }

    fn remove(&self, key: &str) {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(key, error = %e, "failed to remove session key"),
        }
    }
}
