use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Oldest entries are dropped past this many.
const MAX_ENTRIES: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// User-facing notifications, kept in order and fanned out to subscribers.
#[derive(Clone, Debug)]
pub struct ActivityLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    tx: broadcast::Sender<LogEntry>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            entries: Arc::default(),
            tx,
        }
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: current_time(),
            level,
            message: message.into(),
        };
        {
            let mut entries = self.entries.lock();
            entries.push(entry.clone());
            if entries.len() > MAX_ENTRIES {
                let overflow = entries.len() - MAX_ENTRIES;
                entries.drain(..overflow);
            }
        }
        // No subscribers is fine.
        let _ = self.tx.send(entry);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn last(&self) -> Option<LogEntry> {
        self.entries.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn current_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
