//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for dealers, surveys and stored files
//! - Multipart form extraction
//! - Error responses

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sea_orm::DatabaseConnection;
use sitesurvey_core::dealer::DealerService;
use sitesurvey_core::storage::StorageService;
use sitesurvey_core::survey::SurveyService;
use sitesurvey_core::upload::UploadOrchestrator;
use sitesurvey_db::{DealerRepository, SurveyRepository};
use sitesurvey_shared::AppConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Configured remote storage.
    pub storage: Arc<StorageService>,
    /// Upload pipeline over `storage`.
    pub uploads: Arc<UploadOrchestrator<StorageService>>,
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Dealer service over a fresh repository handle.
    #[must_use]
    pub fn dealer_service(&self) -> DealerService<DealerRepository, StorageService> {
        let repo = DealerRepository::new((*self.db).clone());
        DealerService::new(Arc::new(repo), self.uploads.clone())
    }

    /// Survey service over a fresh repository handle.
    #[must_use]
    pub fn survey_service(&self) -> SurveyService<SurveyRepository, StorageService> {
        let repo = SurveyRepository::new((*self.db).clone());
        SurveyService::new(Arc::new(repo), self.uploads.clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_request_bytes;

    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
