use std::path::{Path, PathBuf};
use std::time::Duration;

use api::RetryPolicy;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use store::FileStore;

/// Default settings file, looked up in the working directory.
pub const SETTINGS_FILE: &str = "notemark.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncSettings {
    pub quiet_window_ms: u64,
    pub inter_fetch_delay_ms: u64,
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionSettings {
    /// Empty means the platform data directory.
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub api: ApiSettings,
    pub retry: RetrySettings,
    pub sync: SyncSettings,
    pub session: SessionSettings,
}

impl Settings {
    /// Defaults, then `notemark.toml`, then `NOTEMARK_*` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_path(SETTINGS_FILE)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let config = Config::builder()
            .set_default("api.base_url", "http://localhost:8080/api")?
            .set_default("api.timeout_secs", 30)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 1000)?
            .set_default("sync.quiet_window_ms", 300)?
            .set_default("sync.inter_fetch_delay_ms", 500)?
            .set_default("sync.settle_delay_ms", 500)?
            .set_default("session.dir", "")?
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("NOTEMARK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn session_dir(&self) -> PathBuf {
        if self.session.dir.is_empty() {
            FileStore::default_dir()
        } else {
            PathBuf::from(&self.session.dir)
        }
    }

    pub fn timings(&self) -> SyncTimings {
        SyncTimings {
            quiet_window: Duration::from_millis(self.sync.quiet_window_ms),
            inter_fetch_delay: Duration::from_millis(self.sync.inter_fetch_delay_ms),
            settle_delay: Duration::from_millis(self.sync.settle_delay_ms),
            retry: RetryPolicy::new(
                self.retry.max_attempts,
                Duration::from_millis(self.retry.base_delay_ms),
            ),
        }
    }
}

/// Every delay the synchronization layer waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    /// Debounce interval before a coalesced refresh runs.
    pub quiet_window: Duration,
    /// Pause between the notes fetch and the bookmarks fetch of one refresh.
    pub inter_fetch_delay: Duration,
    /// Pause between a successful write and its confirming re-fetch.
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_millis(300),
            inter_fetch_delay: Duration::from_millis(500),
            settle_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_defaults_match_sync_timings() {
        let settings = Settings::from_path("does-not-exist.toml").unwrap();
        assert_eq!(settings.api.base_url, "http://localhost:8080/api");
        assert_eq!(settings.timings(), SyncTimings::default());
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://notes.example.com/api\"\n\n[sync]\nsettle_delay_ms = 50\n\n[session]\ndir = \"/tmp/nm\""
        )
        .unwrap();

        let settings = Settings::from_path(file.path()).unwrap();
        assert_eq!(settings.api.base_url, "https://notes.example.com/api");
        assert_eq!(settings.sync.settle_delay_ms, 50);
        assert_eq!(settings.sync.quiet_window_ms, 300);
        assert_eq!(settings.session_dir(), PathBuf::from("/tmp/nm"));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        std::env::set_var("NOTEMARK_RETRY__MAX_ATTEMPTS", "5");
        let settings = Settings::from_path("does-not-exist.toml");
        std::env::remove_var("NOTEMARK_RETRY__MAX_ATTEMPTS");

        let settings = settings.unwrap();
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.timings().retry.max_attempts, 5);
    }
}
