//! Database access layer for gfpt-pt
//!
//! Functions that take part in multi-statement writes accept a
//! `&mut SqliteConnection` so callers can pass either a pooled connection
//! or an open transaction. Read-only report queries take the pool.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;

pub mod defects;
pub mod history;
pub mod layout;
pub mod machines;
pub mod notifications;
pub mod operators;
pub mod production;
pub mod reports;

/// Open the shared database file, creating and migrating it as needed
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());

    let pool = gfpt_common::db::init_database(db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    Ok(pool)
}
