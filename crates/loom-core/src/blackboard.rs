//! Process-wide key-value blackboard shared with external components.
//!
//! The blackboard is how the environment registry publishes state that it
//! does not own outright: the bootstrap init marker, per-phase configuration
//! lists, and the active transformer handle. Values are type-erased and
//! retrieved by downcasting to the expected type; a lookup with the wrong
//! type behaves like a missing key.
//!
//! There is no transactional guarantee. Concurrent writers to the same key
//! race and the last one wins.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

/// A type-erased blackboard value.
pub type BlackboardValue = Arc<dyn Any + Send + Sync>;

/// Shared string-keyed store of arbitrary values.
#[derive(Default)]
pub struct Blackboard {
    entries: RwLock<HashMap<String, BlackboardValue>>,
}

impl Blackboard {
    /// Create an empty blackboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn put<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.put_shared(key, Arc::new(value));
    }

    /// Store an already shared value under `key`.
    pub fn put_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        self.entries.write().insert(key.into(), value);
    }

    /// Fetch the value under `key` if it exists and has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.entries.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Fetch the value under `key`, inserting `init()` if it is absent.
    ///
    /// An existing value of a different type is replaced, since nothing
    /// reading it as `T` could have used it.
    pub fn get_or_insert_with<T, F>(&self, key: &str, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            match Arc::clone(existing).downcast::<T>() {
                Ok(value) => return value,
                Err(_) => warn!(key, "replacing blackboard entry of unexpected type"),
            }
        }
        let value = Arc::new(init());
        entries.insert(key.to_owned(), Arc::clone(&value) as BlackboardValue);
        value
    }

    /// Whether any value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Remove the value under `key`. Returns whether one was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the blackboard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Sorted snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

impl core::fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Blackboard")
            .field("keys", &self.keys())
            .finish()
    }
}
