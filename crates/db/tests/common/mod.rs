//! Shared helpers for database integration tests.

#![allow(dead_code)]

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use sitesurvey_core::dealer::{DealerRepository as _, NewDealer};
use sitesurvey_db::{DealerRepository, migration::Migrator};
use uuid::Uuid;

/// Database URL from the environment, if one is configured.
pub fn get_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Connect and bring the schema up to date.
///
/// Returns `None` when `DATABASE_URL` is unset so the calling test can
/// skip. A configured but unreachable database fails the test.
pub async fn setup() -> Option<DatabaseConnection> {
    let Some(url) = get_database_url() else {
        eprintln!("DATABASE_URL is not set, skipping database test");
        return None;
    };

    let db = sitesurvey_db::connect(&url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    Some(db)
}

/// A dealer id no other test run uses.
pub fn unique_dealer_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Insert a dealer through the repository.
pub async fn create_test_dealer(db: &DatabaseConnection, dealer_id: &str, reps: &[&str]) {
    DealerRepository::new(db.clone())
        .insert(NewDealer {
            dealer_id: dealer_id.to_string(),
            name: format!("Dealer {dealer_id}"),
            logo: None,
            reps: reps.iter().map(ToString::to_string).collect(),
        })
        .await
        .expect("Failed to create test dealer");
}
