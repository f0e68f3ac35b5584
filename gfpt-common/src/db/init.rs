//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to
//! date on every start. All statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every connection
const BUSY_TIMEOUT_MS: i64 = 5000;

/// Open (or create) the database file and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets report queries run alongside a writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection that never expires: every pooled connection to
/// `:memory:` would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table, then run versioned migrations
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    let pragma_sql = format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS);
    sqlx::query(&pragma_sql).execute(pool).await?;

    create_schema_version_table(pool).await?;

    // Registries
    create_floors_table(pool).await?;
    create_lines_table(pool).await?;
    create_operators_table(pool).await?;
    create_operator_scores_tables(pool).await?;
    create_defects_table(pool).await?;
    create_machines_tables(pool).await?;
    create_service_notifications_table(pool).await?;

    // Production store
    create_production_records_table(pool).await?;
    create_hourly_tables(pool).await?;
    create_production_history_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_floors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS floors (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lines (
            line_id TEXT PRIMARY KEY,
            floor TEXT NOT NULL REFERENCES floors(name),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_operators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operators (
            guid TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            designation TEXT NOT NULL,
            last_scan_process TEXT,
            last_scan_machine TEXT,
            last_scan_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Best score per process plus the append-only log of superseded scores
async fn create_operator_scores_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operator_process_scores (
            operator_id TEXT NOT NULL REFERENCES operators(guid) ON DELETE CASCADE,
            process_name TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            updated_at TEXT NOT NULL,
            PRIMARY KEY (operator_id, process_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operator_score_history (
            guid TEXT PRIMARY KEY,
            operator_id TEXT NOT NULL REFERENCES operators(guid) ON DELETE CASCADE,
            process_name TEXT NOT NULL,
            previous_score INTEGER NOT NULL,
            new_score INTEGER NOT NULL,
            line TEXT NOT NULL,
            date TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_defects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS defects (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            severity TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_machines_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS machines (
            machine_id TEXT PRIMARY KEY,
            machine_type TEXT NOT NULL,
            floor TEXT,
            line TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS machine_parts (
            guid TEXT PRIMARY KEY,
            machine_id TEXT NOT NULL REFERENCES machines(machine_id) ON DELETE CASCADE,
            part_name TEXT NOT NULL,
            service_interval_days INTEGER NOT NULL CHECK (service_interval_days > 0),
            last_serviced TEXT NOT NULL,
            next_service_date TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_service_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS service_notifications (
            guid TEXT PRIMARY KEY,
            part_id TEXT NOT NULL REFERENCES machine_parts(guid) ON DELETE CASCADE,
            machine_id TEXT NOT NULL,
            message TEXT NOT NULL,
            seen INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Live production records, one per operator per day
async fn create_production_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS production_records (
            guid TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            operator_id TEXT NOT NULL,
            operator_external_id TEXT NOT NULL,
            operator_name TEXT NOT NULL,
            operator_designation TEXT NOT NULL,
            supervisor TEXT NOT NULL,
            floor TEXT NOT NULL,
            line TEXT NOT NULL,
            buyer_id TEXT NOT NULL,
            style_id TEXT NOT NULL,
            job_id TEXT,
            process TEXT NOT NULL,
            machine_id TEXT,
            work_as TEXT NOT NULL CHECK (work_as IN ('operator', 'helper')),
            target INTEGER NOT NULL CHECK (target >= 0),
            previous_line_working_time INTEGER NOT NULL DEFAULT 0
                CHECK (previous_line_working_time >= 0),
            row_no INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_hourly_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hourly_entries (
            guid TEXT PRIMARY KEY,
            record_id TEXT NOT NULL REFERENCES production_records(guid) ON DELETE CASCADE,
            hour TEXT NOT NULL,
            process TEXT,
            production_count INTEGER NOT NULL CHECK (production_count >= 0),
            position INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (record_id, hour)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hourly_defects (
            entry_id TEXT NOT NULL REFERENCES hourly_entries(guid) ON DELETE CASCADE,
            defect_code TEXT NOT NULL REFERENCES defects(code),
            count INTEGER NOT NULL CHECK (count >= 0),
            PRIMARY KEY (entry_id, defect_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Frozen snapshots of records moved off a line
async fn create_production_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS production_history (
            guid TEXT PRIMARY KEY,
            original_record_id TEXT NOT NULL,
            date TEXT NOT NULL,
            operator_id TEXT NOT NULL,
            operator_external_id TEXT NOT NULL,
            operator_name TEXT NOT NULL,
            operator_designation TEXT NOT NULL,
            supervisor TEXT NOT NULL,
            floor TEXT NOT NULL,
            line TEXT NOT NULL,
            buyer_id TEXT NOT NULL,
            style_id TEXT NOT NULL,
            job_id TEXT,
            process TEXT NOT NULL,
            machine_id TEXT,
            work_as TEXT NOT NULL,
            target INTEGER NOT NULL,
            row_no INTEGER NOT NULL,
            hourly_snapshot TEXT NOT NULL DEFAULT '[]',
            action TEXT NOT NULL,
            moved_to_line TEXT NOT NULL,
            previous_line_working_time INTEGER NOT NULL CHECK (previous_line_working_time > 0),
            transferred_by TEXT NOT NULL,
            historized_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
