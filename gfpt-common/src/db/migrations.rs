//! Database schema migrations
//!
//! Versioned, idempotent schema changes applied after the base tables are
//! created. Versions are recorded in `schema_version`.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Stay idempotent** - `IF NOT EXISTS` or explicit existence checks
//! 4. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: uniqueness of live daily entries
///
/// One live record per operator per day, and one per machine per day for
/// records worked in the `operator` role. Helpers float between machines.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: live entry uniqueness indexes");

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_live_operator_day
        ON production_records (date, operator_external_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_live_machine_day
        ON production_records (date, machine_id)
        WHERE work_as = 'operator' AND machine_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Migration v2: lookup indexes for reports, transfers and the servicing poll
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: lookup indexes");

    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_records_line_day ON production_records (date, line)",
        "CREATE INDEX IF NOT EXISTS idx_hourly_record ON hourly_entries (record_id, position)",
        "CREATE INDEX IF NOT EXISTS idx_history_operator_day \
         ON production_history (operator_external_id, date, action)",
        "CREATE INDEX IF NOT EXISTS idx_parts_next_service ON machine_parts (next_service_date)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_part_seen \
         ON service_notifications (part_id, seen)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}
