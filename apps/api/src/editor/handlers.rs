//! Axum route handlers for the editor session host API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editor::fields::FieldName;
use crate::editor::quality::{assess_quality, QualityReport};
use crate::editor::registry::SessionView;
use crate::editor::schema::{schema_for, SchemaDescriptor};
use crate::errors::AppError;
use crate::models::content::{ContentKind, EditableContent};
use crate::publish::SavedContent;
use crate::state::AppState;
use crate::uploads::UploadFile;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub kind: String,
    #[serde(default)]
    pub existing: Option<EditableContent>,
}

#[derive(Debug, Deserialize)]
pub struct SetFieldRequest {
    pub name: String,
    pub value: String,
}

/// A schema plus the full list of fields its form shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    #[serde(flatten)]
    pub schema: SchemaDescriptor,
    pub applicable_fields: Vec<FieldName>,
}

#[derive(Debug, Serialize)]
pub struct SetFieldResponse {
    pub applied: bool,
    pub session: SessionView,
}

fn parse_kind(raw: &str) -> Result<ContentKind, AppError> {
    raw.parse::<ContentKind>()
        .map_err(|k| AppError::Validation(format!("Unknown content kind '{k}'")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/schemas/:kind
pub async fn handle_get_schema(Path(kind): Path<String>) -> Result<Json<SchemaResponse>, AppError> {
    let schema = schema_for(parse_kind(&kind)?);
    Ok(Json(SchemaResponse {
        applicable_fields: schema.applicable_fields(),
        schema,
    }))
}

/// POST /api/v1/quality
///
/// Scores an arbitrary draft without opening a session.
pub async fn handle_score(Json(content): Json<EditableContent>) -> Json<QualityReport> {
    Json(assess_quality(&content))
}

/// POST /api/v1/editor/sessions
pub async fn handle_open(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let kind = parse_kind(&req.kind)?;
    let view = state.sessions.open(req.existing, kind).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/editor/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.view(id).await?))
}

/// PATCH /api/v1/editor/sessions/:id/fields
pub async fn handle_set_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetFieldRequest>,
) -> Result<Json<SetFieldResponse>, AppError> {
    let (applied, session) = state.sessions.set_field(id, &req.name, &req.value).await?;
    Ok(Json(SetFieldResponse { applied, session }))
}

/// POST /api/v1/editor/sessions/:id/draft/restore
pub async fn handle_restore_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.restore_draft(id).await?))
}

/// DELETE /api/v1/editor/sessions/:id/draft
pub async fn handle_discard_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.discard_draft(id).await?))
}

/// POST /api/v1/editor/sessions/:id/commit
pub async fn handle_commit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SavedContent>, AppError> {
    Ok(Json(state.sessions.commit(id).await?))
}

/// DELETE /api/v1/editor/sessions/:id
///
/// Closes without saving; the autosaved snapshot is kept for next time.
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/editor/sessions/:id/uploads/:field
///
/// Expects a multipart body with a `file` part.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path((id, field)): Path<(Uuid, String)>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let mut file = None;
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if part.name() != Some("file") {
            continue;
        }
        let file_name = part.file_name().unwrap_or("upload").to_string();
        let content_type = part
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = part
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        file = Some(UploadFile {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let file = file.ok_or_else(|| AppError::Validation("Missing 'file' part".to_string()))?;
    let view = state
        .sessions
        .upload(id, &field, file, state.uploader.as_deref())
        .await?;
    Ok(Json(view))
}
