//! Live production record store
//!
//! One row per live record in `production_records`; its ordered hourly
//! entries live in `hourly_entries` with per-defect counts in
//! `hourly_defects`.

use chrono::NaiveDate;
use gfpt_common::{time, uuid_utils, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{
    DefectCount, HourlyEntry, OperatorSnapshot, ProductionRecord, RecordState, WorkAs,
};

const RECORD_COLUMNS: &str = "guid, date, operator_id, operator_external_id, operator_name, \
     operator_designation, supervisor, floor, line, buyer_id, style_id, job_id, process, \
     machine_id, work_as, target, previous_line_working_time, row_no";

/// Which identity an existing live record collided on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Operator,
    Machine,
}

/// Optional filters for listing live records
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub operator_external_id: Option<String>,
    pub floor: Option<String>,
    pub line: Option<String>,
}

impl RecordFilter {
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            start: Some(date),
            end: Some(date),
            ..Self::default()
        }
    }
}

/// Build the record base (no hours, given state) from a row
///
/// Shared with the history store, whose rows carry the same columns.
pub(crate) fn record_base_from_row(
    row: &SqliteRow,
    id_column: &str,
    state: RecordState,
) -> Result<ProductionRecord> {
    let id: String = row.try_get(id_column)?;
    let date: String = row.try_get("date")?;
    let operator_id: String = row.try_get("operator_id")?;
    let work_as: String = row.try_get("work_as")?;

    Ok(ProductionRecord {
        id: uuid_utils::parse_stored(id_column, &id)?,
        date: time::parse_stored_day("date", &date)?,
        operator: OperatorSnapshot {
            id: uuid_utils::parse_stored("operator_id", &operator_id)?,
            external_id: row.try_get("operator_external_id")?,
            name: row.try_get("operator_name")?,
            designation: row.try_get("operator_designation")?,
        },
        supervisor: row.try_get("supervisor")?,
        floor: row.try_get("floor")?,
        line: row.try_get("line")?,
        buyer_id: row.try_get("buyer_id")?,
        style_id: row.try_get("style_id")?,
        job_id: row.try_get("job_id")?,
        process: row.try_get("process")?,
        machine_id: row.try_get("machine_id")?,
        work_as: WorkAs::parse(&work_as)
            .ok_or_else(|| Error::Internal(format!("Corrupt work_as '{}'", work_as)))?,
        target: row.try_get("target")?,
        hourly_production: Vec::new(),
        previous_line_working_time: row.try_get("previous_line_working_time")?,
        row_no: row.try_get("row_no")?,
        state,
    })
}

/// Insert a live record and any hourly entries it already carries
pub async fn insert_record(conn: &mut SqliteConnection, record: &ProductionRecord) -> Result<()> {
    let now = time::now_string();

    sqlx::query(
        r#"
        INSERT INTO production_records (
            guid, date, operator_id, operator_external_id, operator_name,
            operator_designation, supervisor, floor, line, buyer_id, style_id, job_id,
            process, machine_id, work_as, target, previous_line_working_time, row_no,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
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
    .bind(record.previous_line_working_time)
    .bind(record.row_no)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    for entry in &record.hourly_production {
        upsert_hour(conn, record.id, entry).await?;
    }

    Ok(())
}

/// Load a live record with its hours
pub async fn load_record(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<ProductionRecord>> {
    let sql = format!("SELECT {} FROM production_records WHERE guid = ?", RECORD_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let mut record = record_base_from_row(&row, "guid", RecordState::Live)?;
            record.hourly_production = load_hours(conn, record.id).await?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// The operator's live record for a day (latest if several slipped in)
pub async fn live_record_for_operator(
    conn: &mut SqliteConnection,
    external_id: &str,
    date: NaiveDate,
) -> Result<Option<ProductionRecord>> {
    let id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT guid FROM production_records
        WHERE operator_external_id = ? AND date = ?
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(external_id)
    .bind(date.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    match id {
        Some(id) => load_record(conn, uuid_utils::parse_stored("guid", &id)?).await,
        None => Ok(None),
    }
}

/// Most recent live record of another operator on `line` for the day
pub async fn seed_record_on_line(
    conn: &mut SqliteConnection,
    line: &str,
    date: NaiveDate,
    excluding_operator: &str,
) -> Result<Option<ProductionRecord>> {
    let sql = format!(
        "SELECT {} FROM production_records \
         WHERE line = ? AND date = ? AND operator_external_id <> ? \
         ORDER BY created_at DESC LIMIT 1",
        RECORD_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(line)
        .bind(date.to_string())
        .bind(excluding_operator)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| record_base_from_row(&row, "guid", RecordState::Live))
        .transpose()
}

/// Look for a live record the new entry would collide with
///
/// `machine_id` is only checked against records worked in the operator
/// role; pass `None` for helper entries.
pub async fn find_duplicate(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    external_id: &str,
    machine_id: Option<&str>,
) -> Result<Option<DuplicateField>> {
    let row = sqlx::query(
        r#"
        SELECT operator_external_id FROM production_records
        WHERE date = ?
          AND (operator_external_id = ?
               OR (? IS NOT NULL AND work_as = 'operator' AND machine_id = ?))
        ORDER BY CASE WHEN operator_external_id = ? THEN 0 ELSE 1 END
        LIMIT 1
        "#,
    )
    .bind(date.to_string())
    .bind(external_id)
    .bind(machine_id)
    .bind(machine_id)
    .bind(external_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| {
        let existing: String = row.get("operator_external_id");
        if existing == external_id {
            DuplicateField::Operator
        } else {
            DuplicateField::Machine
        }
    }))
}

/// Next row ordering number on a line for a day
pub async fn next_row_no(conn: &mut SqliteConnection, date: NaiveDate, line: &str) -> Result<i64> {
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(row_no) FROM production_records WHERE date = ? AND line = ?")
            .bind(date.to_string())
            .bind(line)
            .fetch_one(&mut *conn)
            .await?;

    Ok(max.unwrap_or(0) + 1)
}

/// Delete a live record; hourly entries cascade
pub async fn delete_record(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM production_records WHERE guid = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace or append one hour on a record
///
/// A new hour takes the next position; an existing hour keeps its position
/// and has its count, process and defects overwritten.
pub async fn upsert_hour(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    entry: &HourlyEntry,
) -> Result<()> {
    let record_id = record_id.to_string();
    let now = time::now_string();

    sqlx::query(
        r#"
        INSERT INTO hourly_entries (
            guid, record_id, hour, process, production_count, position, updated_at
        ) VALUES (
            ?, ?, ?, ?, ?,
            (SELECT COALESCE(MAX(position), 0) + 1 FROM hourly_entries WHERE record_id = ?),
            ?
        )
        ON CONFLICT (record_id, hour) DO UPDATE SET
            process = excluded.process,
            production_count = excluded.production_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(&record_id)
    .bind(&entry.hour)
    .bind(&entry.process)
    .bind(entry.production_count)
    .bind(&record_id)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let entry_id: String =
        sqlx::query_scalar("SELECT guid FROM hourly_entries WHERE record_id = ? AND hour = ?")
            .bind(&record_id)
            .bind(&entry.hour)
            .fetch_one(&mut *conn)
            .await?;

    sqlx::query("DELETE FROM hourly_defects WHERE entry_id = ?")
        .bind(&entry_id)
        .execute(&mut *conn)
        .await?;

    for defect in &entry.defects {
        sqlx::query("INSERT INTO hourly_defects (entry_id, defect_code, count) VALUES (?, ?, ?)")
            .bind(&entry_id)
            .bind(&defect.defect_code)
            .bind(defect.count)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Bump `updated_at` on a record
pub async fn touch_record(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE production_records SET updated_at = ? WHERE guid = ?")
        .bind(time::now_string())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Ordered hours of a record with their defects
pub async fn load_hours(conn: &mut SqliteConnection, record_id: Uuid) -> Result<Vec<HourlyEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT e.hour, e.process, e.production_count,
               d.defect_code, d.count AS defect_count
        FROM hourly_entries e
        LEFT JOIN hourly_defects d ON d.entry_id = e.guid
        WHERE e.record_id = ?
        ORDER BY e.position, d.rowid
        "#,
    )
    .bind(record_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let mut hours: Vec<HourlyEntry> = Vec::new();
    for row in rows {
        let hour: String = row.try_get("hour")?;
        let defect_code: Option<String> = row.try_get("defect_code")?;
        let defect_count: Option<i64> = row.try_get("defect_count")?;

        let same_hour = hours.last().map(|h| h.hour == hour).unwrap_or(false);
        if !same_hour {
            hours.push(HourlyEntry {
                hour,
                process: row.try_get("process")?,
                production_count: row.try_get("production_count")?,
                defects: Vec::new(),
            });
        }

        if let (Some(defect_code), Some(count), Some(entry)) =
            (defect_code, defect_count, hours.last_mut())
        {
            entry.defects.push(DefectCount { defect_code, count });
        }
    }

    Ok(hours)
}

/// Live records matching a filter, ordered by date, line and row number
pub async fn list_records(pool: &SqlitePool, filter: &RecordFilter) -> Result<Vec<ProductionRecord>> {
    let mut conn = pool.acquire().await?;

    let sql = format!(
        "SELECT {} FROM production_records \
         WHERE (? IS NULL OR date >= ?) \
           AND (? IS NULL OR date <= ?) \
           AND (? IS NULL OR operator_external_id = ?) \
           AND (? IS NULL OR floor = ?) \
           AND (? IS NULL OR line = ?) \
         ORDER BY date, line, row_no",
        RECORD_COLUMNS
    );

    let start = filter.start.map(|d| d.to_string());
    let end = filter.end.map(|d| d.to_string());
    let rows = sqlx::query(&sql)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .bind(&filter.operator_external_id)
        .bind(&filter.operator_external_id)
        .bind(&filter.floor)
        .bind(&filter.floor)
        .bind(&filter.line)
        .bind(&filter.line)
        .fetch_all(&mut *conn)
        .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let mut record = record_base_from_row(&row, "guid", RecordState::Live)?;
        record.hourly_production = load_hours(&mut conn, record.id).await?;
        records.push(record);
    }

    Ok(records)
}
