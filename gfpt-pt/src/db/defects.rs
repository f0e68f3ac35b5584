//! Defect catalog

use gfpt_common::{time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::models::{Defect, Severity};

fn defect_from_row(row: &SqliteRow) -> Result<Defect> {
    let severity: String = row.try_get("severity")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Defect {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        severity: Severity::parse(&severity)
            .ok_or_else(|| Error::Internal(format!("Corrupt severity '{}'", severity)))?,
        active: row.try_get("active")?,
        created_at: time::parse_stored_timestamp("created_at", &created_at)?,
    })
}

pub async fn insert_defect(pool: &SqlitePool, defect: &Defect) -> Result<()> {
    sqlx::query(
        "INSERT INTO defects (code, name, severity, active, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&defect.code)
    .bind(&defect.name)
    .bind(defect.severity.as_str())
    .bind(defect.active)
    .bind(time::format_timestamp(defect.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_defects(pool: &SqlitePool, active_only: bool) -> Result<Vec<Defect>> {
    let rows = sqlx::query("SELECT * FROM defects WHERE (? = 0 OR active = 1) ORDER BY code")
        .bind(active_only)
        .fetch_all(pool)
        .await?;

    rows.iter().map(defect_from_row).collect()
}

pub async fn find_defect(conn: &mut SqliteConnection, code: &str) -> Result<Option<Defect>> {
    let row = sqlx::query("SELECT * FROM defects WHERE code = ?")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(defect_from_row).transpose()
}

/// Returns false when the code is unknown
pub async fn set_active(pool: &SqlitePool, code: &str, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE defects SET active = ? WHERE code = ?")
        .bind(active)
        .bind(code)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Every catalog entry keyed by code, inactive ones included
///
/// Reports resolve historical defect codes through this, so retired
/// codes still render with their names.
pub async fn catalog(pool: &SqlitePool) -> Result<HashMap<String, Defect>> {
    Ok(list_defects(pool, false)
        .await?
        .into_iter()
        .map(|d| (d.code.clone(), d))
        .collect())
}
