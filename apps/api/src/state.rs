use std::sync::Arc;

use crate::editor::registry::SessionRegistry;
use crate::uploads::Uploader;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    /// `None` when S3 is not configured; upload requests then fail per field.
    pub uploader: Option<Arc<dyn Uploader>>,
}
