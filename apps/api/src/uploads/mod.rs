//! Upload collaborator: stores a file and hands back its public URL.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::content::ContentKind;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("S3 error: {0}")]
    S3(String),
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, kind: ContentKind, file: UploadFile) -> Result<String, UploadError>;
}

/// S3 (or MinIO) backed uploader.
#[derive(Clone)]
pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3Uploader {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, kind: ContentKind, file: UploadFile) -> Result<String, UploadError> {
        if file.bytes.is_empty() {
            return Err(UploadError::Empty);
        }

        let key = object_key(kind, Uuid::new_v4(), &file.file_name);
        let size = file.bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| UploadError::S3(e.to_string()))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// `uploads/<kind>/<id>-<sanitized name>`
fn object_key(kind: ContentKind, id: Uuid, file_name: &str) -> String {
    format!("uploads/{kind}/{id}-{}", sanitize_file_name(file_name))
}

/// Keeps the final path component, lower-cased, with anything outside
/// `[a-z0-9._-]` replaced by `-`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
