use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::session::SessionStorage;

/// In-memory SessionStorage for testing and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SessionStorage for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SESSION_TOKEN_KEY, SESSION_USER_KEY};

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(SESSION_TOKEN_KEY).is_none());

        store.set(SESSION_TOKEN_KEY, "abc");
        store.set(SESSION_USER_KEY, r#"{"id":"1","username":"ada"}"#);
        assert_eq!(store.get(SESSION_TOKEN_KEY).as_deref(), Some("abc"));
        assert_eq!(store.len(), 2);

        store.remove(SESSION_TOKEN_KEY);
        assert!(store.get(SESSION_TOKEN_KEY).is_none());

        // Removing a missing key is a no-op
        store.remove(SESSION_TOKEN_KEY);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", "v");
        assert_eq!(other.get("k").as_deref(), Some("v"));
    }
}
