//! Open editor sessions, addressed by id.
//!
//! Each session sits behind its own mutex. Commit releases that mutex while
//! the collaborator call is in flight; the session is in `Saving` meanwhile,
//! so concurrent edits and a second commit are refused instead of queued.
//!
//! Sessions whose client went away without cancelling are evicted once idle
//! for longer than the configured timeout. Their stored snapshot is kept.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use crate::editor::fields::FieldName;
use crate::editor::quality::QualityReport;
use crate::editor::schema::SchemaDescriptor;
use crate::editor::session::{EditorSession, SessionError, SessionState};
use crate::errors::AppError;
use crate::models::content::{ContentKind, EditableContent};
use crate::publish::{ContentSink, SavedContent};
use crate::storage::DraftStore;
use crate::uploads::{UploadFile, Uploader};

/// Read-only observables of a session, as returned to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub kind: ContentKind,
    pub state: SessionState,
    pub content: EditableContent,
    pub quality_score: u8,
    pub quality: QualityReport,
    pub has_resumable_draft: bool,
    pub autosave_pending: bool,
    pub last_autosave: Option<DateTime<Utc>>,
    pub storage_key: String,
    pub schema: SchemaDescriptor,
}

impl SessionView {
    fn of(id: Uuid, session: &EditorSession) -> Self {
        Self {
            id,
            kind: session.kind(),
            state: session.state(),
            content: session.content().clone(),
            quality_score: session.quality_score(),
            quality: session.quality().clone(),
            has_resumable_draft: session.has_resumable_draft(),
            autosave_pending: session.autosave_pending(),
            last_autosave: session.last_autosave(),
            storage_key: session.storage_key().to_string(),
            schema: session.schema().clone(),
        }
    }
}

struct SessionEntry {
    session: Arc<Mutex<EditorSession>>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    store: Arc<dyn DraftStore>,
    sink: Arc<dyn ContentSink>,
    autosave_delay: Duration,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn DraftStore>,
        sink: Arc<dyn ContentSink>,
        autosave_delay: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            sink,
            autosave_delay,
        }
    }

    /// Looks up a session and marks it as recently used.
    async fn get(&self, id: Uuid) -> Result<Arc<Mutex<EditorSession>>, AppError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Editor session {id} not found")))?;
        entry.last_seen = Instant::now();
        Ok(Arc::clone(&entry.session))
    }

    async fn remove(&self, id: Uuid) {
        self.sessions.write().await.remove(&id);
    }

    pub async fn open(
        &self,
        existing: Option<EditableContent>,
        kind: ContentKind,
    ) -> Result<SessionView, AppError> {
        let session =
            EditorSession::open(existing, kind, Arc::clone(&self.store), self.autosave_delay)
                .await?;
        let id = Uuid::new_v4();
        let view = SessionView::of(id, &session);
        let entry = SessionEntry {
            session: Arc::new(Mutex::new(session)),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        Ok(view)
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, AppError> {
        let session = self.get(id).await?;
        let session = session.lock().await;
        Ok(SessionView::of(id, &session))
    }

    /// Returns whether the field was applied, plus the updated view.
    pub async fn set_field(
        &self,
        id: Uuid,
        name: &str,
        value: &str,
    ) -> Result<(bool, SessionView), AppError> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        let applied = session.set_field(name, value)?;
        Ok((applied, SessionView::of(id, &session)))
    }

    pub async fn restore_draft(&self, id: Uuid) -> Result<SessionView, AppError> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        session.restore_draft().await?;
        Ok(SessionView::of(id, &session))
    }

    pub async fn discard_draft(&self, id: Uuid) -> Result<SessionView, AppError> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        session.discard_draft().await?;
        Ok(SessionView::of(id, &session))
    }

    /// Runs the save on its own task, so a request dropped mid-commit still
    /// settles the session: closed on success, back to `Editing` on failure.
    pub async fn commit(&self, id: Uuid) -> Result<SavedContent, AppError> {
        let handle = self.get(id).await?;
        let payload = handle.lock().await.begin_commit()?;

        let registry = self.clone();
        let settle = tokio::spawn(async move {
            let outcome = registry.sink.save(&payload).await;
            let saved = handle.lock().await.finish_commit(outcome).await?;
            registry.remove(id).await;
            Ok::<_, SessionError>(saved)
        });

        let saved = settle
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Commit task failed")))??;
        Ok(saved)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<(), AppError> {
        let handle = self.get(id).await?;
        handle.lock().await.cancel()?;
        self.remove(id).await;
        Ok(())
    }

    /// Uploads `file` and stores its URL in `field`. The session lock is not
    /// held during the transfer; a failed upload leaves the draft untouched.
    pub async fn upload(
        &self,
        id: Uuid,
        field: &str,
        file: UploadFile,
        uploader: Option<&dyn Uploader>,
    ) -> Result<SessionView, AppError> {
        let target: FieldName = field.parse()?;
        if !target.accepts_upload() {
            return Err(SessionError::NotUploadable(target).into());
        }

        let handle = self.get(id).await?;
        let kind = {
            let session = handle.lock().await;
            if session.state() != SessionState::Editing {
                return Err(SessionError::InvalidState {
                    actual: session.state(),
                    expected: SessionState::Editing,
                }
                .into());
            }
            if !session.schema().allows(target) {
                return Err(AppError::Validation(format!(
                    "{target} is not a field of {}",
                    session.kind()
                )));
            }
            session.kind()
        };

        let uploader = uploader.ok_or_else(|| field_error(field, "uploads are not configured"))?;
        let url = uploader.upload(kind, file).await.map_err(|e| {
            warn!("Upload for {field} failed: {e}");
            field_error(field, &e.to_string())
        })?;

        let mut session = handle.lock().await;
        session.attach_upload(field, &url)?;
        Ok(SessionView::of(id, &session))
    }

    /// Drops sessions untouched for `idle_for`. Sessions that are mid-commit
    /// or currently locked by a request are left alone. Returns how many
    /// were evicted.
    pub async fn evict_idle(&self, idle_for: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, entry| {
            if now.duration_since(entry.last_seen) < idle_for {
                return true;
            }
            match entry.session.try_lock() {
                Ok(session) if session.state() != SessionState::Saving => {
                    info!("Evicting idle {} session {id}", session.kind());
                    false
                }
                _ => true,
            }
        });

        before - sessions.len()
    }

    /// Spawns the background sweep that calls [`SessionRegistry::evict_idle`].
    pub fn spawn_idle_sweep(&self, idle_for: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (idle_for / 4).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle(idle_for).await;
                if evicted > 0 {
                    info!("Evicted {evicted} idle editor session(s)");
                }
            }
        })
    }

    #[cfg(test)]
    pub async fn open_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn field_error(field: &str, message: &str) -> AppError {
    AppError::Upstream(format!("Upload for {field} failed: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::editor::drafts::read_snapshot;
    use crate::models::content::CommitPayload;
    use crate::publish::CommitError;
    use crate::storage::MemoryDraftStore;

    const DELAY: Duration = Duration::from_millis(1000);
    const SETTLE: Duration = Duration::from_millis(1100);

    /// Answers after `latency`, successfully or not.
    struct SlowSink {
        latency: Duration,
        fail: bool,
    }

    #[async_trait]
    impl ContentSink for SlowSink {
        async fn save(&self, payload: &CommitPayload) -> Result<SavedContent, CommitError> {
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(CommitError::Upstream {
                    status: 504,
                    message: "timed out".to_string(),
                });
            }
            Ok(SavedContent {
                id: payload.id.unwrap_or_else(Uuid::new_v4),
                slug: payload.slug.clone(),
            })
        }
    }

    fn registry(store: &Arc<MemoryDraftStore>, fail: bool) -> SessionRegistry {
        let sink = SlowSink {
            latency: Duration::from_secs(5),
            fail,
        };
        SessionRegistry::new(store.clone(), Arc::new(sink), DELAY)
    }

    async fn open_article(registry: &SessionRegistry, title: &str) -> Uuid {
        let id = registry.open(None, ContentKind::Article).await.unwrap().id;
        registry.set_field(id, "title", title).await.unwrap();
        id
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_failing_commit_returns_to_editing() {
        let store = Arc::new(MemoryDraftStore::new());
        let registry = registry(&store, true);
        let id = open_article(&registry, "Still mine").await;

        let request = tokio::spawn({
            let registry = registry.clone();
            async move { registry.commit(id).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.view(id).await.unwrap().state, SessionState::Saving);

        request.abort();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let view = registry.view(id).await.unwrap();
        assert_eq!(view.state, SessionState::Editing);
        assert_eq!(view.content.title, "Still mine");
        registry.set_field(id, "title", "Editable again").await.unwrap();
        registry.cancel(id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_successful_commit_still_closes() {
        let store = Arc::new(MemoryDraftStore::new());
        let registry = registry(&store, false);
        let id = open_article(&registry, "Shipped").await;
        tokio::time::sleep(SETTLE).await;
        assert!(read_snapshot(store.as_ref(), "draft:new:article").await.is_some());

        let request = tokio::spawn({
            let registry = registry.clone();
            async move { registry.commit(id).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        request.abort();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(registry.open_count().await, 0);
        assert!(read_snapshot(store.as_ref(), "draft:new:article").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted_and_snapshot_kept() {
        let store = Arc::new(MemoryDraftStore::new());
        let registry = registry(&store, false);
        let idle = Duration::from_secs(600);

        let abandoned = open_article(&registry, "Left open").await;
        let active = open_article(&registry, "Still typing").await;
        tokio::time::sleep(Duration::from_secs(400)).await;
        registry.view(active).await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(registry.evict_idle(idle).await, 1);
        assert!(matches!(registry.view(abandoned).await, Err(AppError::NotFound(_))));
        assert!(registry.view(active).await.is_ok());

        let reopened = registry.open(None, ContentKind::Article).await.unwrap();
        assert!(reopened.has_resumable_draft);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_skips_sessions_mid_commit() {
        let store = Arc::new(MemoryDraftStore::new());
        let registry = SessionRegistry::new(
            store.clone(),
            Arc::new(SlowSink {
                latency: Duration::from_secs(3600),
                fail: false,
            }),
            DELAY,
        );
        let id = open_article(&registry, "Slow save").await;
        let _request = tokio::spawn({
            let registry = registry.clone();
            async move { registry.commit(id).await }
        });
        tokio::time::sleep(Duration::from_secs(1200)).await;

        assert_eq!(registry.evict_idle(Duration::from_secs(600)).await, 0);
        assert_eq!(registry.open_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_runs_in_background() {
        let store = Arc::new(MemoryDraftStore::new());
        let registry = registry(&store, false);
        let sweep = registry.spawn_idle_sweep(Duration::from_secs(60));

        open_article(&registry, "Forgotten").await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(registry.open_count().await, 0);
        sweep.abort();
    }
}
