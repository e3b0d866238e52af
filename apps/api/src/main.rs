mod candidates;
mod config;
mod db;
mod errors;
mod models;
mod notify;
mod routes;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::candidates::extraction::TextResumeExtractor;
use crate::candidates::intake::IntakeService;
use crate::candidates::repository::PgCandidateRepository;
use crate::candidates::storage::S3ResumeStore;
use crate::config::{Config, ResumeStorageConfig};
use crate::db::{create_pool, ensure_schema};
use crate::notify::{Composer, Mailer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TailentTrail API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Outbound mail
    info!(
        "Mailer: {}:{} ({:?}), dry run: {}",
        config.mailer.host, config.mailer.port, config.mailer.tls, config.mailer.dry_run
    );
    let mailer = Arc::new(Mailer::smtp(config.mailer.clone()));

    let mut intake = IntakeService::new(
        Arc::new(PgCandidateRepository::new(db)),
        Arc::new(TextResumeExtractor),
        Composer::new(&config.exam_link_base, &config.company_name),
        mailer,
        config.delivery_policy,
    );

    // Optional resume storage on S3 / MinIO
    if let Some(storage) = &config.resume_storage {
        let s3 = build_s3_client(storage).await;
        intake = intake.with_resume_store(Arc::new(S3ResumeStore::new(s3, &storage.bucket)));
        info!("Resume storage enabled (bucket: {})", storage.bucket);
    }

    let state = AppState {
        intake: Arc::new(intake),
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // open CORS; restrict origins per deployment

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(storage: &ResumeStorageConfig) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &storage.access_key_id,
        &storage.secret_access_key,
        None,
        None,
        "tailent-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&storage.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
