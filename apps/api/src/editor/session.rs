//! The editor session state machine.
//!
//! ```text
//! Closed -> Opening -> Editing <-> Saving -> Closed
//!                         |
//!                         +--- cancel ---> Closed
//! ```
//!
//! Commit clears the stored snapshot; cancel keeps it so the next session
//! for the same content can offer it back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::editor::drafts::{storage_key, DraftPersistence};
use crate::editor::fields::{apply_field, FieldName};
use crate::editor::pipeline::{build_payload, slugify};
use crate::editor::quality::{assess_quality, QualityReport};
use crate::editor::schema::{schema_for, SchemaDescriptor};
use crate::models::content::{CommitPayload, ContentKind, DraftRecord, EditableContent};
use crate::publish::{CommitError, SavedContent};
use crate::storage::{DraftStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Opening,
    Editing,
    Saving,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Opening => "opening",
            SessionState::Editing => "editing",
            SessionState::Saving => "saving",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Existing content is a {actual}, not a {expected}")]
    KindMismatch {
        expected: ContentKind,
        actual: ContentKind,
    },

    #[error("Existing content has no identity")]
    MissingIdentity,

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: FieldName, reason: String },

    #[error("Field {0} does not accept uploads")]
    NotUploadable(FieldName),

    #[error("No resumable draft")]
    NoResumableDraft,

    #[error("Missing required fields: {}", join_fields(.0))]
    MissingRequired(Vec<FieldName>),

    #[error("Session is {actual}, expected {expected}")]
    InvalidState {
        actual: SessionState,
        expected: SessionState,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),
}

fn join_fields(fields: &[FieldName]) -> String {
    fields
        .iter()
        .map(FieldName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One author editing one piece of content.
pub struct EditorSession {
    state: SessionState,
    schema: SchemaDescriptor,
    draft: EditableContent,
    quality: QualityReport,
    /// A snapshot existed at open time and has not been restored or discarded.
    resumable: bool,
    /// Once set, title edits no longer rewrite the slug.
    slug_locked: bool,
    persistence: DraftPersistence,
}

impl EditorSession {
    /// Seeds the draft from `existing` (or blank defaults for `kind`) and
    /// looks for a resumable snapshot. Only reads from storage.
    pub async fn open(
        existing: Option<EditableContent>,
        kind: ContentKind,
        store: Arc<dyn DraftStore>,
        autosave_delay: Duration,
    ) -> Result<Self, SessionError> {
        let (draft, slug_locked) = match existing {
            Some(mut content) => {
                if content.kind() != kind {
                    return Err(SessionError::KindMismatch {
                        expected: kind,
                        actual: content.kind(),
                    });
                }
                if content.id.is_none() {
                    return Err(SessionError::MissingIdentity);
                }
                content.normalize_seo();
                (content, true)
            }
            None => (EditableContent::blank(kind, Utc::now().date_naive()), false),
        };

        let key = storage_key(draft.id, kind);
        let persistence = DraftPersistence::new(store, key, autosave_delay);

        let mut session = Self {
            state: SessionState::Opening,
            schema: schema_for(kind),
            quality: assess_quality(&draft),
            draft,
            resumable: false,
            slug_locked,
            persistence,
        };

        session.resumable = session.persistence.read_snapshot().await.is_some();
        session.state = SessionState::Editing;

        info!(
            "Opened {kind} session on '{}' (resumable draft: {})",
            session.persistence.key(),
            session.resumable
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn kind(&self) -> ContentKind {
        self.schema.kind
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn content(&self) -> &EditableContent {
        &self.draft
    }

    pub fn quality(&self) -> &QualityReport {
        &self.quality
    }

    pub fn quality_score(&self) -> u8 {
        self.quality.score
    }

    pub fn has_resumable_draft(&self) -> bool {
        self.resumable
    }

    pub fn last_autosave(&self) -> Option<DateTime<Utc>> {
        self.persistence.last_saved()
    }

    /// Whether edits are waiting for the debounce window to close.
    pub fn autosave_pending(&self) -> bool {
        self.persistence.has_pending_write()
    }

    pub fn storage_key(&self) -> &str {
        self.persistence.key()
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                actual: self.state,
                expected,
            })
        }
    }

    /// Recomputes the score and restarts the autosave window.
    fn after_mutation(&mut self) {
        self.quality = assess_quality(&self.draft);
        self.persistence.schedule_snapshot(&self.draft);
    }

    /// Applies one edit. Returns `Ok(false)` when `name` is a real field that
    /// does not belong to this session's kind; such edits are dropped.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<bool, SessionError> {
        self.expect_state(SessionState::Editing)?;
        let field: FieldName = name.parse()?;

        if !apply_field(&mut self.draft, field, value)? {
            debug!("Ignoring {field} on a {} session", self.kind());
            return Ok(false);
        }

        match field {
            FieldName::Slug => self.slug_locked = true,
            FieldName::Title if !self.slug_locked => self.draft.slug = slugify(&self.draft.title),
            _ => {}
        }

        self.after_mutation();
        Ok(true)
    }

    /// Stores an uploaded file's URL into an upload-capable field.
    pub fn attach_upload(&mut self, name: &str, url: &str) -> Result<bool, SessionError> {
        let field: FieldName = name.parse()?;
        if !field.accepts_upload() {
            return Err(SessionError::NotUploadable(field));
        }
        self.set_field(name, url)
    }

    /// Replaces the whole draft with the snapshot currently stored under
    /// this session's key. Any unwritten autosave is dropped first.
    pub async fn restore_draft(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Editing)?;
        if !self.resumable {
            return Err(SessionError::NoResumableDraft);
        }

        self.persistence.cancel_pending();
        let record = self.persistence.read_snapshot().await;
        self.resumable = false;
        let record: DraftRecord = record.ok_or(SessionError::NoResumableDraft)?;

        self.draft = EditableContent::from_record(self.kind(), self.draft.id, &record);
        self.slug_locked = self.draft.id.is_some()
            || (!self.draft.slug.is_empty() && self.draft.slug != slugify(&self.draft.title));

        info!("Restored draft from '{}'", self.persistence.key());
        self.after_mutation();
        Ok(())
    }

    /// Deletes the stored snapshot. The in-memory draft is left alone.
    pub async fn discard_draft(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Editing)?;
        self.persistence.clear_snapshot().await?;
        self.resumable = false;
        Ok(())
    }

    /// Validates the draft and moves to `Saving`, returning the payload to
    /// hand to the commit collaborator. Edits are refused until
    /// [`EditorSession::finish_commit`] is called.
    pub fn begin_commit(&mut self) -> Result<CommitPayload, SessionError> {
        self.expect_state(SessionState::Editing)?;

        let missing = self.schema.missing_required(&self.draft);
        if !missing.is_empty() {
            return Err(SessionError::MissingRequired(missing));
        }

        self.state = SessionState::Saving;
        Ok(build_payload(&self.draft))
    }

    /// Settles a commit started with [`EditorSession::begin_commit`].
    ///
    /// Success closes the session and clears the stored snapshot. Failure
    /// returns to `Editing` with both the draft and the snapshot intact.
    pub async fn finish_commit(
        &mut self,
        outcome: Result<SavedContent, CommitError>,
    ) -> Result<SavedContent, SessionError> {
        self.expect_state(SessionState::Saving)?;

        match outcome {
            Ok(saved) => {
                self.state = SessionState::Closed;
                if let Err(e) = self.persistence.clear_snapshot().await {
                    warn!(
                        "Committed {} but could not clear '{}': {e}",
                        saved.id,
                        self.persistence.key()
                    );
                }
                info!("Committed {} {} ({})", self.kind(), saved.id, saved.slug);
                Ok(saved)
            }
            Err(e) => {
                self.state = SessionState::Editing;
                warn!("Commit of {} session failed: {e}", self.kind());
                Err(SessionError::Commit(e))
            }
        }
    }

    /// Closes without saving. Any pending autosave is dropped; the stored
    /// snapshot stays for the next session.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Editing)?;
        self.persistence.cancel_pending();
        self.state = SessionState::Closed;
        info!("Cancelled {} session on '{}'", self.kind(), self.persistence.key());
        Ok(())
    }
}
