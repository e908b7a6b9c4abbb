//! Initial database migration.
//!
//! Creates the dealers and surveys tables with their indexes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(EXTENSIONS_SQL).await?;
        db.execute_unprepared(DEALERS_SQL).await?;
        db.execute_unprepared(SURVEYS_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const EXTENSIONS_SQL: &str = r"
CREATE EXTENSION IF NOT EXISTS pgcrypto;
";

const DEALERS_SQL: &str = r"
CREATE TABLE dealers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    dealer_id VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    logo VARCHAR(2048),
    reps TEXT[] NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_dealer_id_not_blank CHECK (length(trim(dealer_id)) > 0),
    CONSTRAINT chk_reps_not_empty CHECK (cardinality(reps) >= 1)
);

CREATE INDEX idx_dealers_created_at ON dealers(created_at DESC);
CREATE INDEX idx_dealers_reps ON dealers USING GIN (reps);
";

// Surveys outlive their dealer, so dealer_id is not a foreign key.
const SURVEYS_SQL: &str = r"
CREATE TABLE surveys (
    id SERIAL PRIMARY KEY,
    dealer_id VARCHAR(255) NOT NULL,
    rep_name VARCHAR(255) NOT NULL,
    customer_name VARCHAR(255) NOT NULL,
    customer_address TEXT NOT NULL,
    response_data JSONB NOT NULL DEFAULT '{}'::jsonb,
    photos TEXT[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_response_data_object CHECK (jsonb_typeof(response_data) = 'object')
);

CREATE INDEX idx_surveys_dealer ON surveys(dealer_id);
CREATE INDEX idx_surveys_created_at ON surveys(created_at DESC);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION touch_updated_at() RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_dealers_updated_at
    BEFORE UPDATE ON dealers
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_dealers_updated_at ON dealers;
DROP FUNCTION IF EXISTS touch_updated_at();
DROP TABLE IF EXISTS surveys;
DROP TABLE IF EXISTS dealers;
";
