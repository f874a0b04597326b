//! Durable key-value storage for draft snapshots.
//!
//! Values are opaque strings (serialized `DraftRecord`s). The store makes no
//! promise beyond last-write-wins per key.

pub mod file;
pub mod redis;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

pub use self::file::FileDraftStore;
pub use self::redis::RedisDraftStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store. Snapshots do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_last_write_wins() {
        let store = MemoryDraftStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "one").await.unwrap();
        store.set("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_memory_delete_missing_is_ok() {
        let store = MemoryDraftStore::new();
        store.delete("absent").await.unwrap();
        store.set("k", "v").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
