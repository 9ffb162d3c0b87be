//! Dossier API Server
//!
//! Main entry point for the document ingestion service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dossier_api::{AppState, create_router};
use dossier_core::conversion::FormatNormalizer;
use dossier_core::ingestion::IngestionService;
use dossier_core::storage::{StorageClient, StorageConfig};
use dossier_db::{DocumentRepository, connect};
use dossier_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dossier=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // The account session is authorized on the first upload, not here.
    let storage = StorageClient::new(StorageConfig::from_settings(&config.storage))?;
    info!(
        bucket = %storage.bucket_name(),
        auth_url = %config.storage.auth_url,
        "Object store configured"
    );

    let normalizer = FormatNormalizer::new(config.converter.clone());
    info!(
        image = %config.converter.image.program,
        office = %config.converter.office.program,
        timeout_secs = config.converter.timeout_secs,
        "Converters configured"
    );

    let ingestion = IngestionService::new(
        Arc::new(storage),
        Arc::new(normalizer),
        Arc::new(DocumentRepository::new(db)),
        config.upload.clone(),
    );

    let state = AppState {
        jwt_service: Arc::new(JwtService::new(config.auth.clone())),
        ingestion: Arc::new(ingestion),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
