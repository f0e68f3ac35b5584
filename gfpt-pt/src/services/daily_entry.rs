//! Daily entry: creation of live production records
//!
//! A record is created once per operator per day. For the operator role the
//! machine is also claimed for the day. The duplicate check and the insert
//! share one transaction and the store carries unique indexes on both keys,
//! so two racing submissions cannot both succeed.

use gfpt_common::{time, uuid_utils, Error, EventBus, GfptEvent, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::{require, spawn_last_scan_update};
use crate::db::production::{self, DuplicateField};
use crate::db::operators;
use crate::models::{OperatorSnapshot, ProductionRecord, RecordState, WorkAs};

/// Body of `POST /daily-production`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub date: String,
    /// Operator external id
    pub operator_id: String,
    pub supervisor: String,
    pub floor: String,
    pub line: String,
    #[serde(default)]
    pub buyer_id: Option<String>,
    #[serde(default)]
    pub style_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    pub process: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    pub work_as: String,
    pub target: i64,
}

/// Validated form of a [`CreateEntryRequest`]
struct ValidEntry {
    date: chrono::NaiveDate,
    work_as: WorkAs,
    buyer_id: String,
    style_id: String,
    machine_id: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CreateEntryRequest {
    fn validate(&self) -> Result<ValidEntry> {
        let date = time::parse_day(&self.date)?;

        let work_as = WorkAs::parse(&self.work_as).ok_or_else(|| {
            Error::InvalidInput(format!(
                "workAs must be 'operator' or 'helper', got '{}'",
                self.work_as
            ))
        })?;

        require("operatorId", &self.operator_id)?;
        require("supervisor", &self.supervisor)?;
        require("floor", &self.floor)?;
        require("line", &self.line)?;
        require("process", &self.process)?;

        let buyer_id = non_blank(&self.buyer_id)
            .ok_or_else(|| Error::InvalidInput("buyerId is required".to_string()))?;
        let style_id = non_blank(&self.style_id)
            .ok_or_else(|| Error::InvalidInput("styleId is required".to_string()))?;

        if self.target < 0 {
            return Err(Error::InvalidInput(format!(
                "target must not be negative, got {}",
                self.target
            )));
        }

        let machine_id = non_blank(&self.machine_id);
        if work_as == WorkAs::Operator && machine_id.is_none() {
            return Err(Error::InvalidInput(
                "machineId is required when working as operator".to_string(),
            ));
        }

        Ok(ValidEntry {
            date,
            work_as,
            buyer_id,
            style_id,
            machine_id,
        })
    }
}

pub struct DailyEntryService {
    db: SqlitePool,
    event_bus: EventBus,
}

impl DailyEntryService {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Create a live production record
    pub async fn create_entry(&self, request: &CreateEntryRequest) -> Result<ProductionRecord> {
        let valid = request.validate()?;
        let external_id = request.operator_id.trim();

        let mut tx = self.db.begin().await?;

        let operator = operators::find_by_external_id(&mut tx, external_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Operator '{}' not found", external_id)))?;

        // Helpers do not claim a machine
        let claimed_machine = match valid.work_as {
            WorkAs::Operator => valid.machine_id.as_deref(),
            WorkAs::Helper => None,
        };

        if let Some(field) =
            production::find_duplicate(&mut tx, valid.date, external_id, claimed_machine).await?
        {
            return Err(Error::Conflict(match field {
                DuplicateField::Operator => format!(
                    "Operator '{}' already has a production entry for {}",
                    external_id, valid.date
                ),
                DuplicateField::Machine => format!(
                    "Machine '{}' already has a production entry for {}",
                    claimed_machine.unwrap_or_default(),
                    valid.date
                ),
            }));
        }

        let row_no = production::next_row_no(&mut tx, valid.date, request.line.trim()).await?;

        let record = ProductionRecord {
            id: uuid_utils::generate(),
            date: valid.date,
            operator: OperatorSnapshot {
                id: operator.id,
                external_id: operator.external_id.clone(),
                name: operator.name.clone(),
                designation: operator.designation.clone(),
            },
            supervisor: request.supervisor.trim().to_string(),
            floor: request.floor.trim().to_string(),
            line: request.line.trim().to_string(),
            buyer_id: valid.buyer_id,
            style_id: valid.style_id,
            job_id: non_blank(&request.job_id),
            process: request.process.trim().to_string(),
            machine_id: valid.machine_id,
            work_as: valid.work_as,
            target: request.target,
            hourly_production: Vec::new(),
            previous_line_working_time: 0,
            row_no,
            state: RecordState::Live,
        };

        production::insert_record(&mut tx, &record)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    Error::Conflict(format!(
                        "A production entry for operator '{}' or machine already exists for {}",
                        external_id, record.date
                    ))
                } else {
                    e
                }
            })?;

        tx.commit().await?;

        info!(
            record_id = %record.id,
            operator_id = %record.operator.external_id,
            line = %record.line,
            date = %record.date,
            "Production entry created"
        );

        spawn_last_scan_update(
            self.db.clone(),
            record.operator.external_id.clone(),
            Some(record.process.clone()),
            record.machine_id.clone(),
        );

        self.event_bus.emit_lossy(GfptEvent::ProductionEntryCreated {
            record_id: record.id,
            operator_id: record.operator.external_id.clone(),
            line: record.line.clone(),
            date: record.date,
            timestamp: time::now(),
        });

        Ok(record)
    }
}
