use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::editor::drafts::DEFAULT_AUTOSAVE_DELAY;

/// How long an editor session may sit untouched before it is evicted.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Where autosaved drafts live.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftStoreConfig {
    Memory,
    File { dir: PathBuf },
    Redis { url: String },
}

/// Where committed content is saved.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitBackendConfig {
    Postgres { database_url: String },
    Http { base_url: String, token: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub public_base_url: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a variable required by the selected backends is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub autosave_debounce: Duration,
    pub session_idle_timeout: Duration,
    pub draft_store: DraftStoreConfig,
    pub commit_backend: CommitBackendConfig,
    /// `None` disables uploads.
    pub s3: Option<S3Config>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| -> Result<String> {
            get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let draft_store = match get("DRAFT_STORE").as_deref().unwrap_or("file") {
            "memory" => DraftStoreConfig::Memory,
            "file" => DraftStoreConfig::File {
                dir: get("DRAFT_DIR").unwrap_or_else(|| ".drafts".to_string()).into(),
            },
            "redis" => DraftStoreConfig::Redis {
                url: require("REDIS_URL")?,
            },
            other => bail!("DRAFT_STORE must be memory, file or redis (got '{other}')"),
        };

        let commit_backend = match get("COMMIT_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => CommitBackendConfig::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            "http" => CommitBackendConfig::Http {
                base_url: require("CONTENT_API_URL")?,
                token: get("CONTENT_API_TOKEN"),
            },
            other => bail!("COMMIT_BACKEND must be postgres or http (got '{other}')"),
        };

        let s3 = match get("S3_BUCKET") {
            Some(bucket) => {
                let endpoint = require("S3_ENDPOINT")?;
                let public_base_url = get("S3_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
                Some(S3Config {
                    bucket,
                    endpoint,
                    aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
                    aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
                    public_base_url,
                })
            }
            None => None,
        };

        Ok(Config {
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            autosave_debounce: match get("AUTOSAVE_DEBOUNCE_MS") {
                Some(ms) => Duration::from_millis(
                    ms.parse::<u64>()
                        .context("AUTOSAVE_DEBOUNCE_MS must be a whole number of milliseconds")?,
                ),
                None => DEFAULT_AUTOSAVE_DELAY,
            },
            session_idle_timeout: match get("SESSION_IDLE_TIMEOUT_SECS") {
                Some(secs) => Duration::from_secs(
                    secs.parse::<u64>()
                        .context("SESSION_IDLE_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => DEFAULT_SESSION_IDLE_TIMEOUT,
            },
            draft_store,
            commit_backend,
            s3,
        })
    }
}
