//! Database migration runner for SiteSurvey.
//!
//! Reads `DATABASE_URL` (or `-u <url>`), same as the server's
//! `SITESURVEY__DATABASE__URL`.
//!
//! Usage:
//!   migrator up      - Create the dealers and surveys tables
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use sea_orm_migration::prelude::*;
use sitesurvey_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
