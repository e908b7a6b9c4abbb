//! SiteSurvey API Server
//!
//! Main entry point for the dealer and site-survey backend.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitesurvey_api::{AppState, create_router};
use sitesurvey_core::storage::{StorageConfig, StorageService};
use sitesurvey_core::upload::{UploadOrchestrator, UploadPolicy};
use sitesurvey_db::connect_with;
use sitesurvey_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitesurvey=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    // Storage is built once and shared by every request
    let storage_config = StorageConfig::from_settings(config.storage.clone(), &config.upload);
    let storage = Arc::new(
        StorageService::from_config(storage_config).context("Failed to initialize storage")?,
    );
    info!(
        provider = storage.provider_name(),
        max_file_size = config.upload.max_file_size,
        batch_size = config.upload.batch_size,
        "Storage configured"
    );

    let uploads = Arc::new(UploadOrchestrator::new(
        storage.clone(),
        UploadPolicy::from_settings(&config.upload),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        storage,
        uploads,
        config: Arc::new(config),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
