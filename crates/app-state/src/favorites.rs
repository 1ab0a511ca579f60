//! Favorite universities
//!
//! The favorites list is kept in memory, published on a `watch` channel and
//! written through to the key-value store on every change. Records are
//! identified by name.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{keys, KvError, KvStore};
use thiserror::Error;
use tokio::sync::watch;
use universities_client::UniversityRecord;

/// Favorites error types
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// The new list could not be written
    #[error("Failed to persist favorites: {0}")]
    Persist(#[from] KvError),
}

/// Result type for favorites operations
pub type Result<T> = std::result::Result<T, FavoritesError>;

/// Persisted favorites list
///
/// Cloning is cheap; clones share the same list.
#[derive(Clone)]
pub struct FavoritesState {
    kv: KvStore,
    list_tx: Arc<watch::Sender<Vec<UniversityRecord>>>,
    write_lock: Arc<Mutex<()>>,
    initialized: Arc<AtomicBool>,
}

impl FavoritesState {
    /// Load favorites from the store
    ///
    /// Missing or unreadable data yields an empty list.
    pub fn load(kv: KvStore) -> Self {
        let list = match kv.get::<Vec<UniversityRecord>>(keys::FAVORITES) {
            Ok(Some(list)) => list,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load favorites, starting empty: {}", e);
                Vec::new()
            }
        };

        tracing::debug!(count = list.len(), "favorites loaded");

        let (list_tx, _) = watch::channel(list);
        Self {
            kv,
            list_tx: Arc::new(list_tx),
            write_lock: Arc::new(Mutex::new(())),
            initialized: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the stored list has been read
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Add the record, or remove it if a record with the same name is saved
    ///
    /// Returns whether the record is a favorite afterwards. When the write
    /// fails the in-memory list is left unchanged.
    pub fn toggle(&self, record: &UniversityRecord) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let mut list = self.list_tx.borrow().clone();
        let added = match list.iter().position(|saved| saved.name == record.name) {
            Some(index) => {
                list.remove(index);
                false
            }
            None => {
                list.push(record.clone());
                true
            }
        };

        self.kv.set(keys::FAVORITES, &list)?;
        self.list_tx.send_replace(list);

        tracing::debug!(name = %record.name, added, "favorite toggled");
        Ok(added)
    }

    /// Whether a university with this name is saved
    pub fn is_favorite(&self, name: &str) -> bool {
        self.list_tx.borrow().iter().any(|saved| saved.name == name)
    }

    /// Saved universities in the order they were added
    pub fn list(&self) -> Vec<UniversityRecord> {
        self.list_tx.borrow().clone()
    }

    /// Number of saved universities
    pub fn len(&self) -> usize {
        self.list_tx.borrow().len()
    }

    /// Whether nothing is saved
    pub fn is_empty(&self) -> bool {
        self.list_tx.borrow().is_empty()
    }

    /// Subscribe to list changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<UniversityRecord>> {
        self.list_tx.subscribe()
    }
}

impl std::fmt::Debug for FavoritesState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesState")
            .field("count", &self.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
