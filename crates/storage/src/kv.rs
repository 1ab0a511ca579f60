//! Key-value store for preferences and favorites
//!
//! Values are JSON-serialized and stored under plain string keys in a sled
//! tree. All operations are synchronous and cheap enough to call from async
//! code directly.

use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Flush interval in milliseconds (None for flush on explicit `flush` only)
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "whitebeard_kv.db".to_string(),
            cache_capacity: 8 * 1024 * 1024,
            flush_every_ms: Some(500),
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Key-value store implementation
///
/// Clones share the same underlying database.
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").field("keys", &self.db.len()).finish()
    }
}

impl KvStore {
    /// Open (or create) a store on disk
    pub fn new(config: KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        tracing::debug!(path = %config.path, "opened key-value store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Create an in-memory key-value store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Get a value by key
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.db.get(Self::check_key(key)?)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get the raw stored string for a key, if it holds a JSON string
    ///
    /// Used for values written by older builds that may not match the current
    /// enum shape.
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get::<serde_json::Value>(key)? {
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    /// Set a value by key
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(Self::check_key(key)?, bytes)?;
        Ok(())
    }

    /// Remove a value by key, returning whether it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.db.remove(Self::check_key(key)?)?.is_some())
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.contains_key(Self::check_key(key)?)?)
    }

    /// Clear all data
    pub fn clear(&self) -> Result<()> {
        self.db.clear()?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    fn check_key(key: &str) -> Result<&[u8]> {
        if key.is_empty() {
            return Err(KvError::InvalidKey("key cannot be empty".to_string()));
        }
        Ok(key.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Saved {
        name: String,
        count: u32,
    }

    #[test]
    fn test_kv_store_creation() {
        let store = KvStore::in_memory().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let store = KvStore::in_memory().unwrap();
        store.set("greeting", "hello").unwrap();

        let value: Option<String> = store.get("greeting").unwrap();
        assert_eq!(value, Some("hello".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_and_get_list() {
        let store = KvStore::in_memory().unwrap();
        let items = vec![
            Saved { name: "a".to_string(), count: 1 },
            Saved { name: "b".to_string(), count: 2 },
        ];
        store.set("items", &items).unwrap();

        let loaded: Option<Vec<Saved>> = store.get("items").unwrap();
        assert_eq!(loaded, Some(items));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = KvStore::in_memory().unwrap();
        let value: Option<String> = store.get("missing").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_get_wrong_shape_is_serialization_error() {
        let store = KvStore::in_memory().unwrap();
        store.set("items", &42).unwrap();

        let result: Result<Option<Vec<Saved>>> = store.get("items");
        assert!(matches!(result, Err(KvError::Serialization(_))));
    }

    #[test]
    fn test_get_string() {
        let store = KvStore::in_memory().unwrap();
        store.set("mode", "dark").unwrap();
        store.set("number", &3).unwrap();

        assert_eq!(store.get_string("mode").unwrap(), Some("dark".to_string()));
        assert_eq!(store.get_string("number").unwrap(), None);
        assert_eq!(store.get_string("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_and_contains() {
        let store = KvStore::in_memory().unwrap();
        store.set("key", &true).unwrap();
        assert!(store.contains("key").unwrap());

        assert!(store.remove("key").unwrap());
        assert!(!store.remove("key").unwrap());
        assert!(!store.contains("key").unwrap());
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = KvStore::in_memory().unwrap();
        assert!(matches!(store.set("", &1), Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_clear() {
        let store = KvStore::in_memory().unwrap();
        store.set("a", &1).unwrap();
        store.set("b", &2).unwrap();

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kv.db").to_string_lossy().to_string();

        {
            let store = KvStore::new(KvConfig::new(&path)).unwrap();
            store.set("favorite", "Oxford").unwrap();
            store.flush().unwrap();
        }

        let store = KvStore::new(KvConfig::new(&path)).unwrap();
        assert_eq!(store.get::<String>("favorite").unwrap(), Some("Oxford".to_string()));
    }
}
