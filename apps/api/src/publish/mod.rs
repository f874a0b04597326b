//! Commit collaborators: where finished drafts are saved.

pub mod http;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::content::CommitPayload;

pub use self::http::HttpContentSink;
pub use self::postgres::PgContentSink;

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Content {0} not found")]
    NotFound(Uuid),

    #[error("Content rejected: {0}")]
    Rejected(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

/// Identity assigned to committed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedContent {
    pub id: Uuid,
    pub slug: String,
}

/// Implement this to change where content is persisted without touching
/// the editor. Carried in the session registry as `Arc<dyn ContentSink>`.
#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Creates the content when `payload.id` is `None`, updates it otherwise.
    async fn save(&self, payload: &CommitPayload) -> Result<SavedContent, CommitError>;
}
