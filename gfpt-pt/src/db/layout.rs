//! Floor and line registry

use gfpt_common::{time, Error, Result};
use sqlx::{Row, SqlitePool};

use crate::models::{Floor, Line};

pub async fn insert_floor(pool: &SqlitePool, floor: &Floor) -> Result<()> {
    sqlx::query("INSERT INTO floors (name, created_at) VALUES (?, ?)")
        .bind(&floor.name)
        .bind(time::format_timestamp(floor.created_at))
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn list_floors(pool: &SqlitePool) -> Result<Vec<Floor>> {
    let rows = sqlx::query("SELECT name, created_at FROM floors ORDER BY name")
        .fetch_all(pool)
        .await?;

    let mut floors = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: String = row.try_get("created_at")?;
        floors.push(Floor {
            name: row.try_get("name")?,
            created_at: time::parse_stored_timestamp("created_at", &created_at)?,
        });
    }
    Ok(floors)
}

/// Register a line under an existing floor
pub async fn insert_line(pool: &SqlitePool, line: &Line) -> Result<()> {
    let mut tx = pool.begin().await?;

    let floor_exists: Option<String> = sqlx::query_scalar("SELECT name FROM floors WHERE name = ?")
        .bind(&line.floor)
        .fetch_optional(&mut *tx)
        .await?;

    if floor_exists.is_none() {
        return Err(Error::NotFound(format!("Floor '{}' not found", line.floor)));
    }

    sqlx::query("INSERT INTO lines (line_id, floor, created_at) VALUES (?, ?, ?)")
        .bind(&line.line_id)
        .bind(&line.floor)
        .bind(time::format_timestamp(line.created_at))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn list_lines(pool: &SqlitePool, floor: Option<&str>) -> Result<Vec<Line>> {
    let rows = sqlx::query(
        "SELECT line_id, floor, created_at FROM lines \
         WHERE (? IS NULL OR floor = ?) ORDER BY floor, line_id",
    )
    .bind(floor)
    .bind(floor)
    .fetch_all(pool)
    .await?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: String = row.try_get("created_at")?;
        lines.push(Line {
            line_id: row.try_get("line_id")?,
            floor: row.try_get("floor")?,
            created_at: time::parse_stored_timestamp("created_at", &created_at)?,
        });
    }
    Ok(lines)
}
