//! Draft persistence: storage keys, debounced snapshots, tolerant recovery.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::editor::autosave::Debouncer;
use crate::models::content::{ContentKind, DraftRecord, EditableContent};
use crate::storage::{DraftStore, StoreError};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1000);

/// `draft:edit:<id>` for existing content, `draft:new:<kind>` otherwise.
/// All new drafts of one kind share a single scratch key.
pub fn storage_key(id: Option<Uuid>, kind: ContentKind) -> String {
    match id {
        Some(id) => format!("draft:edit:{id}"),
        None => format!("draft:new:{kind}"),
    }
}

/// Parses a stored snapshot. Unreadable values count as absent.
pub fn parse_snapshot(key: &str, raw: &str) -> Option<DraftRecord> {
    match serde_json::from_str::<DraftRecord>(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring unreadable draft snapshot at '{key}': {e}");
            None
        }
    }
}

/// Reads the snapshot under `key`. Storage and parse failures are logged
/// and reported as no snapshot.
pub async fn read_snapshot(store: &dyn DraftStore, key: &str) -> Option<DraftRecord> {
    match store.get(key).await {
        Ok(Some(raw)) => parse_snapshot(key, &raw),
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read draft snapshot at '{key}': {e}");
            None
        }
    }
}

/// A snapshot is only worth keeping once the author has typed something.
fn worth_saving(draft: &EditableContent) -> bool {
    !draft.title.is_empty() || !draft.content.is_empty()
}

/// Owns the storage key and autosave timer of one editor session.
pub struct DraftPersistence {
    store: Arc<dyn DraftStore>,
    key: String,
    debouncer: Debouncer,
    /// Held for the whole of a store write. A write that has started runs to
    /// completion even if its timer task is aborted, and `clear_snapshot`
    /// waits for it before deleting.
    write_lock: Arc<Mutex<()>>,
    last_saved: Arc<watch::Sender<Option<DateTime<Utc>>>>,
}

impl DraftPersistence {
    pub fn new(store: Arc<dyn DraftStore>, key: String, delay: Duration) -> Self {
        let (last_saved, _) = watch::channel(None);
        Self {
            store,
            key,
            debouncer: Debouncer::new(delay),
            write_lock: Arc::new(Mutex::new(())),
            last_saved: Arc::new(last_saved),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// When the most recent autosave of this session landed.
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        *self.last_saved.borrow()
    }

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub async fn read_snapshot(&self) -> Option<DraftRecord> {
        read_snapshot(self.store.as_ref(), &self.key).await
    }

    /// Restarts the debounce window with `draft` as the value to write.
    /// A blank draft cancels the pending write and schedules nothing.
    pub fn schedule_snapshot(&mut self, draft: &EditableContent) {
        if !worth_saving(draft) {
            self.debouncer.cancel();
            return;
        }

        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let last_saved = Arc::clone(&self.last_saved);
        let draft = draft.clone();

        self.debouncer.schedule(async move {
            let guard = write_lock.lock_owned().await;
            let timestamp = Utc::now();
            let record = DraftRecord::capture(&draft, timestamp);
            let raw = match serde_json::to_string(&record) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Failed to serialize draft for '{key}': {e}");
                    return;
                }
            };

            // Detached so that aborting the timer cannot cut a write in half.
            let write = tokio::spawn(async move {
                let _guard = guard;
                match store.set(&key, &raw).await {
                    Ok(()) => {
                        last_saved.send_replace(Some(timestamp));
                        info!("Autosaved draft to '{key}'");
                    }
                    Err(e) => warn!("Autosave to '{key}' failed: {e}"),
                }
            });
            if let Err(e) = write.await {
                warn!("Autosave task failed: {e}");
            }
        });
    }

    /// Drops any pending autosave without writing it.
    pub fn cancel_pending(&mut self) {
        self.debouncer.cancel();
    }

    /// Cancels any pending autosave, waits out a write already in progress,
    /// then deletes the stored snapshot.
    pub async fn clear_snapshot(&mut self) -> Result<(), StoreError> {
        self.debouncer.cancel();
        let _guard = self.write_lock.lock().await;
        self.store.delete(&self.key).await?;
        info!("Cleared draft snapshot '{}'", self.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDraftStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn draft(title: &str) -> EditableContent {
        let mut d = EditableContent::blank(
            ContentKind::Article,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        d.title = title.to_string();
        d
    }

    fn article_persistence(store: Arc<dyn DraftStore>) -> DraftPersistence {
        DraftPersistence::new(store, "draft:new:article".into(), DEFAULT_AUTOSAVE_DELAY)
    }

    /// Finishes each write on a detached task after `latency`, the way file
    /// I/O keeps running on the blocking pool after its caller is dropped.
    struct SlowStore {
        inner: Arc<MemoryDraftStore>,
        latency: Duration,
    }

    #[async_trait]
    impl DraftStore for SlowStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            let inner = Arc::clone(&self.inner);
            let (key, value, latency) = (key.to_string(), value.to_string(), self.latency);
            let write = tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                inner.set(&key, &value).await
            });
            write.await.map_err(|e| StoreError::Io(std::io::Error::other(e)))?
        }
        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[test]
    fn test_storage_key_derivation() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            storage_key(Some(id), ContentKind::Project),
            "draft:edit:67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        assert_eq!(
            storage_key(Some(id), ContentKind::Skill),
            storage_key(Some(id), ContentKind::Project)
        );
        assert_eq!(storage_key(None, ContentKind::Project), "draft:new:project");
    }

    #[test]
    fn test_corrupt_snapshot_is_absent() {
        assert!(parse_snapshot("k", "{not json").is_none());
        assert!(parse_snapshot("k", "{\"title\":\"no timestamp\"}").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_written_after_quiet_period() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut persistence = article_persistence(store.clone());

        persistence.schedule_snapshot(&draft("first"));
        tokio::time::sleep(Duration::from_millis(500)).await;
        persistence.schedule_snapshot(&draft("second"));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(store.get("draft:new:article").await.unwrap().is_none());
        assert!(persistence.last_saved().is_none());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let record = persistence.read_snapshot().await.unwrap();
        assert_eq!(record.title, "second");
        assert_eq!(persistence.last_saved(), Some(record.timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_draft_is_never_written() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut persistence = article_persistence(store.clone());

        persistence.schedule_snapshot(&draft("typed"));
        persistence.schedule_snapshot(&draft(""));
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(store.get("draft:new:article").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_write() {
        let store = Arc::new(MemoryDraftStore::new());
        store.set("draft:new:article", "stale").await.unwrap();
        let mut persistence = article_persistence(store.clone());

        persistence.schedule_snapshot(&draft("pending"));
        persistence.clear_snapshot().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(store.get("draft:new:article").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_draft_still_counts_as_input() {
        let store = Arc::new(MemoryDraftStore::new());
        let mut persistence = article_persistence(store.clone());
        persistence.schedule_snapshot(&draft("   "));
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(persistence.read_snapshot().await.unwrap().title, "   ");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_waits_for_write_in_progress() {
        let inner = Arc::new(MemoryDraftStore::new());
        let store = Arc::new(SlowStore {
            inner: Arc::clone(&inner),
            latency: Duration::from_millis(500),
        });
        let mut persistence = article_persistence(store);

        persistence.schedule_snapshot(&draft("mid-write"));
        // timer has fired; the store write is still in progress
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(inner.get("draft:new:article").await.unwrap().is_none());

        persistence.clear_snapshot().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(inner.get("draft:new:article").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_tolerates_garbage() {
        let store = Arc::new(MemoryDraftStore::new());
        store.set("draft:new:article", "garbage").await.unwrap();
        let persistence = article_persistence(store);
        assert!(persistence.read_snapshot().await.is_none());
    }
}
