//! Service notifications raised by the servicing poll

use chrono::NaiveDate;
use gfpt_common::{time, uuid_utils, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::machines::part_from_row;
use crate::models::{MachinePart, ServiceNotification};

fn notification_from_row(row: &SqliteRow) -> Result<ServiceNotification> {
    let id: String = row.try_get("guid")?;
    let part_id: String = row.try_get("part_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(ServiceNotification {
        id: uuid_utils::parse_stored("guid", &id)?,
        part_id: uuid_utils::parse_stored("part_id", &part_id)?,
        machine_id: row.try_get("machine_id")?,
        message: row.try_get("message")?,
        seen: row.try_get("seen")?,
        created_at: time::parse_stored_timestamp("created_at", &created_at)?,
    })
}

/// Active parts due on or before `today`
pub async fn overdue_parts(pool: &SqlitePool, today: NaiveDate) -> Result<Vec<MachinePart>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM machine_parts
        WHERE active = 1 AND next_service_date <= ?
        ORDER BY next_service_date, machine_id, part_name
        "#,
    )
    .bind(today.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(part_from_row).collect()
}

/// Insert a notification unless the part already has an unseen one
///
/// The existence check and the insert are a single statement, so two
/// overlapping scans cannot both raise a notification for the same part.
/// Returns the notification when one was written.
pub async fn insert_if_absent(
    pool: &SqlitePool,
    part: &MachinePart,
    message: &str,
) -> Result<Option<ServiceNotification>> {
    let notification = ServiceNotification {
        id: uuid_utils::generate(),
        part_id: part.id,
        machine_id: part.machine_id.clone(),
        message: message.to_string(),
        seen: false,
        created_at: time::now(),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO service_notifications (guid, part_id, machine_id, message, seen, created_at)
        SELECT ?, ?, ?, ?, 0, ?
        WHERE NOT EXISTS (
            SELECT 1 FROM service_notifications WHERE part_id = ? AND seen = 0
        )
        "#,
    )
    .bind(notification.id.to_string())
    .bind(part.id.to_string())
    .bind(&notification.machine_id)
    .bind(&notification.message)
    .bind(time::format_timestamp(notification.created_at))
    .bind(part.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(notification))
}

pub async fn list_notifications(
    pool: &SqlitePool,
    unseen_only: bool,
) -> Result<Vec<ServiceNotification>> {
    let rows = sqlx::query(
        "SELECT * FROM service_notifications WHERE (? = 0 OR seen = 0) \
         ORDER BY created_at DESC, rowid DESC",
    )
    .bind(unseen_only)
    .fetch_all(pool)
    .await?;

    rows.iter().map(notification_from_row).collect()
}

/// Returns false when the id is unknown
pub async fn mark_seen(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE service_notifications SET seen = 1 WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
