//! Durable key/value area used to keep a login across restarts.

/// Key holding the bearer token.
pub const SESSION_TOKEN_KEY: &str = "token";

/// Key holding the JSON-encoded [`crate::UserInfo`].
pub const SESSION_USER_KEY: &str = "user";

/// Synchronous string key/value storage.
///
/// Writes are best-effort: implementations log failures instead of
/// returning them, the same way a browser's `localStorage` behaves.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}
