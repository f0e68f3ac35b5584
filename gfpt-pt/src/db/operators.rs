//! Operator registry, process scores and score history

use chrono::{DateTime, NaiveDate, Utc};
use gfpt_common::{time, uuid_utils, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::operator::ratchet;
use crate::models::{LastScan, Operator, ScoreChange, ScoreHistoryEntry};

pub async fn insert_operator(pool: &SqlitePool, operator: &Operator) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO operators (guid, external_id, name, designation, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(operator.id.to_string())
    .bind(&operator.external_id)
    .bind(&operator.name)
    .bind(&operator.designation)
    .bind(time::format_timestamp(operator.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

fn operator_from_row(row: &SqliteRow) -> Result<Operator> {
    let id: String = row.try_get("guid")?;
    let created_at: String = row.try_get("created_at")?;
    let last_scan_at: Option<String> = row.try_get("last_scan_at")?;

    let last_scan = match last_scan_at {
        Some(at) => Some(LastScan {
            process: row.try_get("last_scan_process")?,
            machine_id: row.try_get("last_scan_machine")?,
            scanned_at: time::parse_stored_timestamp("last_scan_at", &at)?,
        }),
        None => None,
    };

    Ok(Operator {
        id: uuid_utils::parse_stored("guid", &id)?,
        external_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        designation: row.try_get("designation")?,
        process_scores: HashMap::new(),
        last_scan,
        created_at: time::parse_stored_timestamp("created_at", &created_at)?,
    })
}

async fn load_scores(conn: &mut SqliteConnection, operator_id: Uuid) -> Result<HashMap<String, i64>> {
    let rows = sqlx::query(
        "SELECT process_name, score FROM operator_process_scores WHERE operator_id = ?",
    )
    .bind(operator_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let mut scores = HashMap::with_capacity(rows.len());
    for row in rows {
        scores.insert(row.try_get("process_name")?, row.try_get("score")?);
    }
    Ok(scores)
}

/// Look up an operator by the badge/external id printed on their card
pub async fn find_by_external_id(
    conn: &mut SqliteConnection,
    external_id: &str,
) -> Result<Option<Operator>> {
    let row = sqlx::query("SELECT * FROM operators WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let mut operator = operator_from_row(&row)?;
            operator.process_scores = load_scores(conn, operator.id).await?;
            Ok(Some(operator))
        }
        None => Ok(None),
    }
}

pub async fn list_operators(pool: &SqlitePool) -> Result<Vec<Operator>> {
    let mut conn = pool.acquire().await?;

    let rows = sqlx::query("SELECT * FROM operators ORDER BY external_id")
        .fetch_all(&mut *conn)
        .await?;

    let mut operators = Vec::with_capacity(rows.len());
    for row in rows {
        let mut operator = operator_from_row(&row)?;
        operator.process_scores = load_scores(&mut conn, operator.id).await?;
        operators.push(operator);
    }
    Ok(operators)
}

/// Record where an operator was last seen working
///
/// Returns false when no operator has that external id.
pub async fn update_last_scan(
    pool: &SqlitePool,
    external_id: &str,
    process: Option<&str>,
    machine_id: Option<&str>,
    scanned_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE operators
        SET last_scan_process = ?, last_scan_machine = ?, last_scan_at = ?
        WHERE external_id = ?
        "#,
    )
    .bind(process)
    .bind(machine_id)
    .bind(time::format_timestamp(scanned_at))
    .bind(external_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Offer an observed hourly count to the operator's score for a process
///
/// Runs read-compare-write in one transaction. When the observation
/// supersedes a stored score the old value is appended to the history log
/// before the score is replaced.
pub async fn offer_score(
    pool: &SqlitePool,
    operator_id: Uuid,
    process_name: &str,
    observed: i64,
    line: &str,
    date: NaiveDate,
) -> Result<Option<ScoreChange>> {
    let mut tx = pool.begin().await?;

    let stored: Option<i64> = sqlx::query_scalar(
        "SELECT score FROM operator_process_scores WHERE operator_id = ? AND process_name = ?",
    )
    .bind(operator_id.to_string())
    .bind(process_name)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(new_score) = ratchet(stored, observed) else {
        return Ok(None);
    };

    let now = time::now_string();

    if let Some(previous) = stored {
        sqlx::query(
            r#"
            INSERT INTO operator_score_history (
                guid, operator_id, process_name, previous_score, new_score, line, date, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_utils::generate().to_string())
        .bind(operator_id.to_string())
        .bind(process_name)
        .bind(previous)
        .bind(new_score)
        .bind(line)
        .bind(date.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO operator_process_scores (operator_id, process_name, score, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (operator_id, process_name) DO UPDATE SET
            score = excluded.score,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(operator_id.to_string())
    .bind(process_name)
    .bind(new_score)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    debug!(
        operator_id = %operator_id,
        process = process_name,
        previous = ?stored,
        new_score,
        "Process score raised"
    );

    Ok(Some(ScoreChange {
        process_name: process_name.to_string(),
        previous_score: stored,
        new_score,
    }))
}

/// Superseded scores, oldest first
pub async fn score_history(pool: &SqlitePool, operator_id: Uuid) -> Result<Vec<ScoreHistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT process_name, previous_score, new_score, line, date, recorded_at
        FROM operator_score_history
        WHERE operator_id = ?
        ORDER BY recorded_at, rowid
        "#,
    )
    .bind(operator_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut history = Vec::with_capacity(rows.len());
    for row in rows {
        let date: String = row.try_get("date")?;
        let recorded_at: String = row.try_get("recorded_at")?;
        history.push(ScoreHistoryEntry {
            process_name: row.try_get("process_name")?,
            previous_score: row.try_get("previous_score")?,
            new_score: row.try_get("new_score")?,
            line: row.try_get("line")?,
            date: time::parse_stored_day("date", &date)?,
            recorded_at: time::parse_stored_timestamp("recorded_at", &recorded_at)?,
        });
    }
    Ok(history)
}
