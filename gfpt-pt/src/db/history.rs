//! History store: frozen snapshots of records moved off a line
//!
//! Rows are written once by the line-transfer service and never updated.
//! The hourly entries are kept as a JSON snapshot of the moment of transfer.

use chrono::NaiveDate;
use gfpt_common::{time, uuid_utils, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};

use super::production::record_base_from_row;
use crate::models::{HistoryAction, HourlyEntry, ProductionRecord, RecordState};

/// Write a historized record
///
/// `record.state` must be [`RecordState::Historized`];
/// `record.previous_line_working_time` holds the net minutes banked.
pub async fn insert_history(conn: &mut SqliteConnection, record: &ProductionRecord) -> Result<()> {
    let RecordState::Historized {
        history_id,
        action,
        moved_to_line,
        transferred_by,
        historized_at,
    } = &record.state
    else {
        return Err(Error::Internal(format!(
            "Record {} is live and cannot be written to history",
            record.id
        )));
    };

    let snapshot = serde_json::to_string(&record.hourly_production)
        .map_err(|e| Error::Internal(format!("Failed to serialize hourly snapshot: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO production_history (
            guid, original_record_id, date, operator_id, operator_external_id,
            operator_name, operator_designation, supervisor, floor, line, buyer_id,
            style_id, job_id, process, machine_id, work_as, target, row_no,
            hourly_snapshot, action, moved_to_line, previous_line_working_time,
            transferred_by, historized_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(history_id.to_string())
    .bind(record.id.to_string())
    .bind(record.date.to_string())
    .bind(record.operator.id.to_string())
    .bind(&record.operator.external_id)
    .bind(&record.operator.name)
    .bind(&record.operator.designation)
    .bind(&record.supervisor)
    .bind(&record.floor)
    .bind(&record.line)
    .bind(&record.buyer_id)
    .bind(&record.style_id)
    .bind(&record.job_id)
    .bind(&record.process)
    .bind(&record.machine_id)
    .bind(record.work_as.as_str())
    .bind(record.target)
    .bind(record.row_no)
    .bind(&snapshot)
    .bind(action.as_str())
    .bind(moved_to_line)
    .bind(record.previous_line_working_time)
    .bind(transferred_by)
    .bind(time::format_timestamp(*historized_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Minutes already banked for an operator's line changes on a day
pub async fn banked_minutes(
    conn: &mut SqliteConnection,
    external_id: &str,
    date: NaiveDate,
) -> Result<i64> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT SUM(previous_line_working_time) FROM production_history
        WHERE operator_external_id = ? AND date = ? AND action = ?
        "#,
    )
    .bind(external_id)
    .bind(date.to_string())
    .bind(HistoryAction::LineChange.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(total.unwrap_or(0))
}

fn history_from_row(row: &SqliteRow) -> Result<ProductionRecord> {
    let history_id: String = row.try_get("guid")?;
    let action: String = row.try_get("action")?;
    let historized_at: String = row.try_get("historized_at")?;

    let state = RecordState::Historized {
        history_id: uuid_utils::parse_stored("guid", &history_id)?,
        action: HistoryAction::parse(&action)
            .ok_or_else(|| Error::Internal(format!("Corrupt history action '{}'", action)))?,
        moved_to_line: row.try_get("moved_to_line")?,
        transferred_by: row.try_get("transferred_by")?,
        historized_at: time::parse_stored_timestamp("historized_at", &historized_at)?,
    };

    let mut record = record_base_from_row(row, "original_record_id", state)?;

    let snapshot: String = row.try_get("hourly_snapshot")?;
    record.hourly_production = serde_json::from_str::<Vec<HourlyEntry>>(&snapshot)
        .map_err(|e| Error::Internal(format!("Corrupt hourly snapshot: {}", e)))?;

    Ok(record)
}

/// Historized records for an operator within an inclusive day range
pub async fn list_history(
    pool: &SqlitePool,
    external_id: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<ProductionRecord>> {
    let start = start.map(|d| d.to_string());
    let end = end.map(|d| d.to_string());

    let rows = sqlx::query(
        r#"
        SELECT * FROM production_history
        WHERE operator_external_id = ?
          AND (? IS NULL OR date >= ?)
          AND (? IS NULL OR date <= ?)
        ORDER BY date, historized_at
        "#,
    )
    .bind(external_id)
    .bind(&start)
    .bind(&start)
    .bind(&end)
    .bind(&end)
    .fetch_all(pool)
    .await?;

    rows.iter().map(history_from_row).collect()
}
