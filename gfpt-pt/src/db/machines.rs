//! Machine registry and per-part service schedule

use chrono::NaiveDate;
use gfpt_common::{time, uuid_utils, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::models::machine::next_service_date;
use crate::models::{Machine, MachinePart};

fn machine_from_row(row: &SqliteRow) -> Result<Machine> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Machine {
        machine_id: row.try_get("machine_id")?,
        machine_type: row.try_get("machine_type")?,
        floor: row.try_get("floor")?,
        line: row.try_get("line")?,
        active: row.try_get("active")?,
        parts: Vec::new(),
        created_at: time::parse_stored_timestamp("created_at", &created_at)?,
    })
}

pub(crate) fn part_from_row(row: &SqliteRow) -> Result<MachinePart> {
    let id: String = row.try_get("guid")?;
    let last_serviced: String = row.try_get("last_serviced")?;
    let next_service: String = row.try_get("next_service_date")?;

    Ok(MachinePart {
        id: uuid_utils::parse_stored("guid", &id)?,
        machine_id: row.try_get("machine_id")?,
        part_name: row.try_get("part_name")?,
        service_interval_days: row.try_get("service_interval_days")?,
        last_serviced: time::parse_stored_day("last_serviced", &last_serviced)?,
        next_service_date: time::parse_stored_day("next_service_date", &next_service)?,
        active: row.try_get("active")?,
    })
}

async fn load_parts(conn: &mut SqliteConnection, machine_id: &str) -> Result<Vec<MachinePart>> {
    let rows = sqlx::query("SELECT * FROM machine_parts WHERE machine_id = ? ORDER BY part_name")
        .bind(machine_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(part_from_row).collect()
}

pub async fn insert_machine(pool: &SqlitePool, machine: &Machine) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO machines (machine_id, machine_type, floor, line, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&machine.machine_id)
    .bind(&machine.machine_type)
    .bind(&machine.floor)
    .bind(&machine.line)
    .bind(machine.active)
    .bind(time::format_timestamp(machine.created_at))
    .execute(&mut *tx)
    .await?;

    for part in &machine.parts {
        insert_part_row(&mut *tx, part).await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn insert_part_row(conn: &mut SqliteConnection, part: &MachinePart) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO machine_parts (
            guid, machine_id, part_name, service_interval_days,
            last_serviced, next_service_date, active
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(part.id.to_string())
    .bind(&part.machine_id)
    .bind(&part.part_name)
    .bind(part.service_interval_days)
    .bind(part.last_serviced.to_string())
    .bind(part.next_service_date.to_string())
    .bind(part.active)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Attach a part to an existing machine
pub async fn insert_part(pool: &SqlitePool, part: &MachinePart) -> Result<()> {
    let mut conn = pool.acquire().await?;

    if find_machine(&mut conn, &part.machine_id).await?.is_none() {
        return Err(Error::NotFound(format!("Machine '{}' not found", part.machine_id)));
    }

    insert_part_row(&mut conn, part).await
}

pub async fn find_machine(conn: &mut SqliteConnection, machine_id: &str) -> Result<Option<Machine>> {
    let row = sqlx::query("SELECT * FROM machines WHERE machine_id = ?")
        .bind(machine_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let mut machine = machine_from_row(&row)?;
            machine.parts = load_parts(conn, &machine.machine_id).await?;
            Ok(Some(machine))
        }
        None => Ok(None),
    }
}

pub async fn list_machines(pool: &SqlitePool) -> Result<Vec<Machine>> {
    let mut conn = pool.acquire().await?;

    let rows = sqlx::query("SELECT * FROM machines ORDER BY machine_id")
        .fetch_all(&mut *conn)
        .await?;

    let mut machines = Vec::with_capacity(rows.len());
    for row in rows {
        let mut machine = machine_from_row(&row)?;
        machine.parts = load_parts(&mut conn, &machine.machine_id).await?;
        machines.push(machine);
    }
    Ok(machines)
}

/// Record a service on a part and clear its pending notifications
///
/// Returns the updated part, or `None` when the id is unknown.
pub async fn mark_part_serviced(
    pool: &SqlitePool,
    part_id: Uuid,
    serviced_on: NaiveDate,
) -> Result<Option<MachinePart>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT * FROM machine_parts WHERE guid = ?")
        .bind(part_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut part = part_from_row(&row)?;

    part.last_serviced = serviced_on;
    part.next_service_date = next_service_date(serviced_on, part.service_interval_days)?;

    sqlx::query("UPDATE machine_parts SET last_serviced = ?, next_service_date = ? WHERE guid = ?")
        .bind(part.last_serviced.to_string())
        .bind(part.next_service_date.to_string())
        .bind(part_id.to_string())
        .execute(&mut *tx)
        .await?;

    let cleared = sqlx::query("UPDATE service_notifications SET seen = 1 WHERE part_id = ? AND seen = 0")
        .bind(part_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    debug!(
        part_id = %part_id,
        next_service_date = %part.next_service_date,
        cleared = cleared.rows_affected(),
        "Part serviced"
    );

    Ok(Some(part))
}
