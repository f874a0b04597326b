mod config;
mod db;
mod editor;
mod errors;
mod models;
mod publish;
mod routes;
mod state;
mod storage;
mod uploads;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{CommitBackendConfig, Config, DraftStoreConfig, S3Config};
use crate::db::create_pool;
use crate::editor::registry::SessionRegistry;
use crate::publish::{ContentSink, HttpContentSink, PgContentSink};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{DraftStore, FileDraftStore, MemoryDraftStore, RedisDraftStore};
use crate::uploads::{S3Uploader, Uploader};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_draft_store(&config.draft_store).await?;
    let sink = build_content_sink(&config.commit_backend).await?;

    let uploader: Option<Arc<dyn Uploader>> = match &config.s3 {
        Some(s3) => {
            let client = build_s3_client(s3).await;
            info!("S3 uploads enabled (bucket: {})", s3.bucket);
            Some(Arc::new(S3Uploader::new(
                client,
                s3.bucket.clone(),
                s3.public_base_url.clone(),
            )))
        }
        None => {
            info!("S3_BUCKET not set, uploads disabled");
            None
        }
    };

    info!(
        "Autosave debounce: {}ms",
        config.autosave_debounce.as_millis()
    );

    let sessions = SessionRegistry::new(store, sink, config.autosave_debounce);
    sessions.spawn_idle_sweep(config.session_idle_timeout);
    info!(
        "Idle editor sessions evicted after {}s",
        config.session_idle_timeout.as_secs()
    );

    let state = AppState { sessions, uploader };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_draft_store(config: &DraftStoreConfig) -> Result<Arc<dyn DraftStore>> {
    let store: Arc<dyn DraftStore> = match config {
        DraftStoreConfig::Memory => {
            info!("Draft store: in-memory (drafts do not survive restarts)");
            Arc::new(MemoryDraftStore::new())
        }
        DraftStoreConfig::File { dir } => {
            info!("Draft store: files under {}", dir.display());
            Arc::new(FileDraftStore::new(dir.clone()))
        }
        DraftStoreConfig::Redis { url } => Arc::new(RedisDraftStore::connect(url).await?),
    };
    Ok(store)
}

async fn build_content_sink(config: &CommitBackendConfig) -> Result<Arc<dyn ContentSink>> {
    let sink: Arc<dyn ContentSink> = match config {
        CommitBackendConfig::Postgres { database_url } => {
            let pool = create_pool(database_url).await?;
            Arc::new(PgContentSink::new(pool))
        }
        CommitBackendConfig::Http { base_url, token } => {
            info!("Committing content to {base_url}");
            Arc::new(HttpContentSink::new(base_url, token.clone())?)
        }
    };
    Ok(sink)
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "folio-static",
    );

    let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint)
        .load()
        .await;

    // MinIO serves buckets as path segments, not subdomains
    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
