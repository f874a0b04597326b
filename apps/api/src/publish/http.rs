//! Commits content to a remote content API over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::{CommitError, ContentSink, SavedContent};
use crate::models::content::CommitPayload;

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HttpContentSink {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpContentSink {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, payload: &CommitPayload) -> String {
        match payload.id {
            Some(id) => format!("{}/contents/{id}", self.base_url),
            None => format!("{}/contents", self.base_url),
        }
    }
}

#[async_trait]
impl ContentSink for HttpContentSink {
    /// POST for new content, PUT for existing. Retries on 429 and 5xx with
    /// exponential backoff.
    async fn save(&self, payload: &CommitPayload) -> Result<SavedContent, CommitError> {
        let url = self.endpoint(payload);
        let mut last_error: Option<CommitError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                // 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Commit attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let request = match payload.id {
                Some(_) => self.client.put(&url),
                None => self.client.post(&url),
            };
            let request = match &self.token {
                Some(token) => request.bearer_auth(token),
                None => request,
            };

            let response = match request.json(payload).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(CommitError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Content API returned {}: {}", status, body);
                last_error = Some(CommitError::Upstream {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                if let Some(id) = payload.id {
                    return Err(CommitError::NotFound(id));
                }
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CommitError::Rejected(error_message(&body)));
            }

            let saved: SavedContent = response.json().await?;
            debug!("Content API saved {} as {}", payload.kind(), saved.id);
            return Ok(saved);
        }

        Err(last_error.unwrap_or(CommitError::Upstream {
            status: 0,
            message: format!("gave up after {MAX_ATTEMPTS} attempts"),
        }))
    }
}

/// Pulls a human-readable message out of an error body:
/// `{"error": {"message"}}`, `{"message"}`, or the raw text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
