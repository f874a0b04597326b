use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{CommitError, ContentSink, SavedContent};
use crate::models::content::CommitPayload;

const UNIQUE_VIOLATION: &str = "23505";

/// Saves content rows into the `contents` table.
///
/// Kind-specific attributes and the SEO block are stored as JSONB.
#[derive(Clone)]
pub struct PgContentSink {
    pool: PgPool,
}

impl PgContentSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, payload: &CommitPayload) -> Result<SavedContent, CommitError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO contents
                (id, kind, title, slug, content, tags, status, date, excerpt, attributes, seo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(payload.kind().as_str())
        .bind(&payload.title)
        .bind(&payload.slug)
        .bind(&payload.content)
        .bind(&payload.tags)
        .bind(payload.status.as_str())
        .bind(payload.date)
        .bind(&payload.excerpt)
        .bind(Json(&payload.attributes))
        .bind(Json(&payload.seo))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        info!("Inserted {} {id} ({})", payload.kind(), payload.slug);
        Ok(SavedContent {
            id,
            slug: payload.slug.clone(),
        })
    }

    async fn update(&self, id: Uuid, payload: &CommitPayload) -> Result<SavedContent, CommitError> {
        let result = sqlx::query(
            r#"
            UPDATE contents
            SET title = $2, slug = $3, content = $4, tags = $5, status = $6,
                date = $7, excerpt = $8, attributes = $9, seo = $10, updated_at = now()
            WHERE id = $1 AND kind = $11
            "#,
        )
        .bind(id)
        .bind(&payload.title)
        .bind(&payload.slug)
        .bind(&payload.content)
        .bind(&payload.tags)
        .bind(payload.status.as_str())
        .bind(payload.date)
        .bind(&payload.excerpt)
        .bind(Json(&payload.attributes))
        .bind(Json(&payload.seo))
        .bind(payload.kind().as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CommitError::NotFound(id));
        }

        info!("Updated {} {id}", payload.kind());
        Ok(SavedContent {
            id,
            slug: payload.slug.clone(),
        })
    }
}

#[async_trait]
impl ContentSink for PgContentSink {
    async fn save(&self, payload: &CommitPayload) -> Result<SavedContent, CommitError> {
        match payload.id {
            None => self.insert(payload).await,
            Some(id) => self.update(id, payload).await,
        }
    }
}

fn map_db_error(err: sqlx::Error) -> CommitError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            CommitError::Rejected("slug is already taken".to_string())
        }
        _ => CommitError::Database(err),
    }
}
