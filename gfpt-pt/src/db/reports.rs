//! Read-only aggregation queries over live production records

use chrono::NaiveDate;
use gfpt_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::models::report::{
    AttendanceEntry, AttendanceStatus, FloorProduction, LineProduction, ProductionSummary,
    RoleMismatch,
};
use crate::models::WorkAs;

/// Per-record achievement, joined onto `production_records r` as `h`
const ACHIEVEMENT_JOIN: &str = "LEFT JOIN (\
         SELECT record_id, SUM(production_count) AS total \
         FROM hourly_entries GROUP BY record_id\
     ) h ON h.record_id = r.guid";

fn parse_work_as(value: &str) -> Result<WorkAs> {
    WorkAs::parse(value).ok_or_else(|| Error::Internal(format!("Corrupt work_as '{}'", value)))
}

/// Target and achievement per (floor, line) for one day
pub async fn line_totals(
    pool: &SqlitePool,
    date: NaiveDate,
    floor: Option<&str>,
    supervisor: Option<&str>,
) -> Result<Vec<LineProduction>> {
    let sql = format!(
        "SELECT r.floor, r.line, COUNT(*) AS records, \
                SUM(r.target) AS total_target, \
                SUM(COALESCE(h.total, 0)) AS total_achievement \
         FROM production_records r {} \
         WHERE r.date = ? \
           AND (? IS NULL OR r.floor = ?) \
           AND (? IS NULL OR r.supervisor = ?) \
         GROUP BY r.floor, r.line \
         ORDER BY r.floor, r.line",
        ACHIEVEMENT_JOIN
    );

    let rows = sqlx::query(&sql)
        .bind(date.to_string())
        .bind(floor)
        .bind(floor)
        .bind(supervisor)
        .bind(supervisor)
        .fetch_all(pool)
        .await?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        lines.push(LineProduction {
            floor: row.try_get("floor")?,
            line: row.try_get("line")?,
            records: row.try_get("records")?,
            summary: ProductionSummary::new(
                row.try_get("total_target")?,
                row.try_get("total_achievement")?,
            ),
        });
    }
    Ok(lines)
}

/// Target and achievement per floor for one day
pub async fn floor_totals(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<FloorProduction>> {
    let sql = format!(
        "SELECT r.floor, COUNT(DISTINCT r.line) AS lines, COUNT(*) AS records, \
                SUM(r.target) AS total_target, \
                SUM(COALESCE(h.total, 0)) AS total_achievement \
         FROM production_records r {} \
         WHERE r.date = ? \
         GROUP BY r.floor \
         ORDER BY r.floor",
        ACHIEVEMENT_JOIN
    );

    let rows = sqlx::query(&sql)
        .bind(date.to_string())
        .fetch_all(pool)
        .await?;

    let mut floors = Vec::with_capacity(rows.len());
    for row in rows {
        floors.push(FloorProduction {
            floor: row.try_get("floor")?,
            lines: row.try_get("lines")?,
            records: row.try_get("records")?,
            summary: ProductionSummary::new(
                row.try_get("total_target")?,
                row.try_get("total_achievement")?,
            ),
        });
    }
    Ok(floors)
}

fn attendance_from_row(row: &SqliteRow) -> Result<AttendanceEntry> {
    let work_as: Option<String> = row.try_get("work_as")?;
    let work_as = work_as.as_deref().map(parse_work_as).transpose()?;

    Ok(AttendanceEntry {
        operator_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        designation: row.try_get("designation")?,
        status: if work_as.is_some() {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        },
        work_as,
        floor: row.try_get("floor")?,
        line: row.try_get("line")?,
    })
}

/// Every registered operator with their live record for the day, if any
pub async fn attendance_rows(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<AttendanceEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT o.external_id, o.name, o.designation, r.work_as, r.floor, r.line
        FROM operators o
        LEFT JOIN production_records r
            ON r.operator_external_id = o.external_id AND r.date = ?
        ORDER BY o.external_id
        "#,
    )
    .bind(date.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(attendance_from_row).collect()
}

/// Operators working the day in a role other than their registered designation
pub async fn role_mismatches(
    pool: &SqlitePool,
    date: NaiveDate,
    designation: Option<&str>,
    work_as: Option<WorkAs>,
) -> Result<Vec<RoleMismatch>> {
    let work_as = work_as.map(|w| w.as_str());

    let rows = sqlx::query(
        r#"
        SELECT o.external_id, o.name, o.designation, r.work_as, r.floor, r.line
        FROM production_records r
        JOIN operators o ON o.external_id = r.operator_external_id
        WHERE r.date = ?
          AND LOWER(TRIM(o.designation)) <> r.work_as
          AND (? IS NULL OR LOWER(o.designation) = LOWER(?))
          AND (? IS NULL OR r.work_as = ?)
        ORDER BY r.floor, r.line, r.row_no
        "#,
    )
    .bind(date.to_string())
    .bind(designation)
    .bind(designation)
    .bind(work_as)
    .bind(work_as)
    .fetch_all(pool)
    .await?;

    let mut mismatches = Vec::with_capacity(rows.len());
    for row in rows {
        let work_as: String = row.try_get("work_as")?;
        mismatches.push(RoleMismatch {
            operator_id: row.try_get("external_id")?,
            name: row.try_get("name")?,
            designation: row.try_get("designation")?,
            work_as: parse_work_as(&work_as)?,
            floor: row.try_get("floor")?,
            line: row.try_get("line")?,
        });
    }
    Ok(mismatches)
}
