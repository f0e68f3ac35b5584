//! Line transfer: moving an operator to another line mid-shift
//!
//! The caller reports the total minutes the operator has worked on previous
//! lines so far today. Only the part not already banked by earlier transfers
//! is attributed to the line being left:
//!
//! ```text
//! reported   banked before   net banked now
//!    60            0               60
//!   150           60               90
//!   150          150          rejected (nothing new)
//! ```
//!
//! Everything from locating the live record to inserting its replacement
//! happens in one transaction.

use chrono::NaiveDate;
use gfpt_common::{time, uuid_utils, Error, EventBus, GfptEvent, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::{require, spawn_last_scan_update};
use crate::db::{history, production};
use crate::models::{HistoryAction, ProductionRecord, RecordState};

/// Body of `PUT /operator-line-transfer/transfer`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Operator external id
    pub operator_id: String,
    pub date: String,
    pub new_line: String,
    /// Cumulative minutes worked on previous lines today
    pub working_hours_in_previous_line: i64,
    pub transferred_by: String,
}

/// Result of a committed transfer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub net_minutes_saved: i64,
    /// New live record on the destination line
    pub record: ProductionRecord,
    /// Snapshot of the record that was moved off the old line
    pub history: ProductionRecord,
}

/// Minutes to bank for this transfer, or `None` when nothing new was worked
pub fn net_minutes(reported: i64, already_banked: i64) -> Option<i64> {
    let net = reported - already_banked;
    (net > 0).then_some(net)
}

struct ValidTransfer {
    date: NaiveDate,
    new_line: String,
}

impl TransferRequest {
    fn validate(&self) -> Result<ValidTransfer> {
        require("operatorId", &self.operator_id)?;
        require("newLine", &self.new_line)?;
        require("transferredBy", &self.transferred_by)?;
        let date = time::parse_day(&self.date)?;

        if self.working_hours_in_previous_line < 0 {
            return Err(Error::InvalidInput(
                "workingHoursInPreviousLine must not be negative".to_string(),
            ));
        }

        Ok(ValidTransfer {
            date,
            new_line: self.new_line.trim().to_string(),
        })
    }
}

pub struct LineTransferService {
    db: SqlitePool,
    event_bus: EventBus,
}

impl LineTransferService {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Move the operator's live record for the day to `new_line`
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferOutcome> {
        let valid = request.validate()?;
        let external_id = request.operator_id.trim();

        let mut tx = self.db.begin().await?;

        let outcome = transfer_in(
            &mut tx,
            external_id,
            valid.date,
            &valid.new_line,
            request.working_hours_in_previous_line,
            request.transferred_by.trim(),
        )
        .await
        .map_err(hide_store_failure)?;

        tx.commit().await.map_err(|e| hide_store_failure(e.into()))?;

        info!(
            operator_id = %external_id,
            from_line = %outcome.history.line,
            to_line = %outcome.record.line,
            net_minutes = outcome.net_minutes_saved,
            "Operator transferred"
        );

        self.event_bus.emit_lossy(GfptEvent::OperatorTransferred {
            operator_id: external_id.to_string(),
            from_line: outcome.history.line.clone(),
            to_line: outcome.record.line.clone(),
            net_minutes: outcome.net_minutes_saved,
            timestamp: time::now(),
        });

        // Machine is assigned again on the new line
        spawn_last_scan_update(
            self.db.clone(),
            external_id.to_string(),
            Some(outcome.record.process.clone()),
            None,
        );

        Ok(outcome)
    }

    /// Historized segments for an operator on one day
    pub async fn history(&self, external_id: &str, date: &str) -> Result<Vec<ProductionRecord>> {
        require("operatorId", external_id)?;
        let date = time::parse_day(date)?;
        history::list_history(&self.db, external_id.trim(), Some(date), Some(date)).await
    }
}

/// Store failures inside the transfer become a generic internal error
///
/// Logged once, where the error is turned into a response.
fn hide_store_failure(err: Error) -> Error {
    match err {
        Error::Database(e) => Error::Internal(format!("Line transfer rolled back: {}", e)),
        other => other,
    }
}

async fn transfer_in(
    conn: &mut SqliteConnection,
    external_id: &str,
    date: NaiveDate,
    new_line: &str,
    reported_minutes: i64,
    transferred_by: &str,
) -> Result<TransferOutcome> {
    let banked = history::banked_minutes(conn, external_id, date).await?;
    let net = net_minutes(reported_minutes, banked).ok_or_else(|| {
        Error::Conflict(format!(
            "No new time to bank: {} minutes reported, {} already banked",
            reported_minutes, banked
        ))
    })?;

    let live = production::live_record_for_operator(conn, external_id, date)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "No production entry for operator '{}' on {}",
                external_id, date
            ))
        })?;

    if live.line == new_line {
        return Err(Error::InvalidInput(format!(
            "Operator '{}' is already on line '{}'",
            external_id, new_line
        )));
    }

    let seed = production::seed_record_on_line(conn, new_line, date, external_id)
        .await?
        .ok_or_else(|| {
            Error::Conflict(format!(
                "Destination line '{}' has no seed data for {}",
                new_line, date
            ))
        })?;

    let snapshot = ProductionRecord {
        previous_line_working_time: net,
        state: RecordState::Historized {
            history_id: uuid_utils::generate(),
            action: HistoryAction::LineChange,
            moved_to_line: new_line.to_string(),
            transferred_by: transferred_by.to_string(),
            historized_at: time::now(),
        },
        ..live.clone()
    };
    history::insert_history(conn, &snapshot).await?;

    production::delete_record(conn, live.id).await?;

    let row_no = production::next_row_no(conn, date, new_line).await?;
    let record = ProductionRecord {
        id: uuid_utils::generate(),
        date,
        operator: live.operator,
        supervisor: seed.supervisor,
        floor: seed.floor,
        line: new_line.to_string(),
        buyer_id: seed.buyer_id,
        style_id: seed.style_id,
        job_id: seed.job_id,
        process: live.process,
        machine_id: None,
        work_as: live.work_as,
        target: live.target,
        hourly_production: Vec::new(),
        previous_line_working_time: 0,
        row_no,
        state: RecordState::Live,
    };
    production::insert_record(conn, &record).await?;

    Ok(TransferOutcome {
        net_minutes_saved: net,
        record,
        history: snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_reports_bank_only_new_minutes() {
        let mut banked = 0;
        let mut results = Vec::new();
        for reported in [60, 150, 150] {
            let net = net_minutes(reported, banked);
            if let Some(net) = net {
                banked += net;
            }
            results.push(net);
        }
        assert_eq!(results, vec![Some(60), Some(90), None]);
    }

    #[test]
    fn test_report_below_banked_rejected() {
        assert_eq!(net_minutes(30, 60), None);
        assert_eq!(net_minutes(0, 0), None);
    }

    #[test]
    fn test_validate_rejects_blank_line() {
        let request = TransferRequest {
            operator_id: "OP-001".to_string(),
            date: "2024-05-01".to_string(),
            new_line: " ".to_string(),
            working_hours_in_previous_line: 60,
            transferred_by: "Karim".to_string(),
        };
        assert!(matches!(request.validate(), Err(Error::InvalidInput(_))));
    }
}
