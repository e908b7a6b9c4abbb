//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod dealers;
pub mod files;
pub mod health;
pub mod surveys;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(dealers::routes())
        .merge(surveys::routes())
        .merge(files::routes())
}
