//! Hourly update: per-hour output and defects on a live record, plus the
//! operator score ratchet that follows it

use gfpt_common::{time, Error, EventBus, GfptEvent, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{defects, operators, production};
use crate::models::{DefectCount, HourlyEntry, ProductionRecord, ScoreChange};

/// Body of `PUT /daily-production/update-hourly`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyUpdateRequest {
    pub id: Uuid,
    pub hourly_production: Vec<HourlyEntry>,
}

/// Check counts and hour labels; fold repeated defect codes within an hour
fn normalize_hours(hours: &[HourlyEntry]) -> Result<Vec<HourlyEntry>> {
    if hours.is_empty() {
        return Err(Error::InvalidInput(
            "hourlyProduction must contain at least one hour".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(hours.len());

    for entry in hours {
        let hour = entry.hour.trim();
        if hour.is_empty() {
            return Err(Error::InvalidInput("hour label is required".to_string()));
        }
        if !seen.insert(hour.to_string()) {
            return Err(Error::InvalidInput(format!("hour '{}' appears more than once", hour)));
        }
        if entry.production_count < 0 {
            return Err(Error::InvalidInput(format!(
                "productionCount for hour '{}' must not be negative",
                hour
            )));
        }

        let mut defects: Vec<DefectCount> = Vec::with_capacity(entry.defects.len());
        for defect in &entry.defects {
            let code = defect.defect_code.trim();
            if code.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "defectCode is required in hour '{}'",
                    hour
                )));
            }
            if defect.count < 0 {
                return Err(Error::InvalidInput(format!(
                    "count for defect '{}' in hour '{}' must not be negative",
                    code, hour
                )));
            }
            match defects.iter_mut().find(|d| d.defect_code == code) {
                Some(existing) => existing.count += defect.count,
                None => defects.push(DefectCount {
                    defect_code: code.to_string(),
                    count: defect.count,
                }),
            }
        }

        normalized.push(HourlyEntry {
            hour: hour.to_string(),
            process: entry
                .process
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            production_count: entry.production_count,
            defects,
        });
    }

    Ok(normalized)
}

/// Best hourly count per process on a record
fn best_per_process(record: &ProductionRecord) -> BTreeMap<String, i64> {
    let mut best: BTreeMap<String, i64> = BTreeMap::new();
    for entry in &record.hourly_production {
        let process = entry.process_or(&record.process).to_string();
        let slot = best.entry(process).or_insert(entry.production_count);
        if entry.production_count > *slot {
            *slot = entry.production_count;
        }
    }
    best
}

pub struct HourlyUpdateService {
    db: SqlitePool,
    event_bus: EventBus,
}

impl HourlyUpdateService {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Apply a batch of hours to a live record in one transaction
    ///
    /// Returns the updated record. The score sync runs afterwards and does
    /// not affect the outcome.
    pub async fn record_hours(&self, request: &HourlyUpdateRequest) -> Result<ProductionRecord> {
        let hours = normalize_hours(&request.hourly_production)?;

        let mut tx = self.db.begin().await?;

        if production::load_record(&mut tx, request.id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "Production record {} not found",
                request.id
            )));
        }

        let codes: BTreeSet<String> = hours
            .iter()
            .flat_map(|h| h.defects.iter().map(|d| d.defect_code.clone()))
            .collect();
        for code in &codes {
            match defects::find_defect(&mut tx, code).await? {
                Some(defect) if defect.active => {}
                Some(_) => {
                    return Err(Error::InvalidInput(format!("Defect '{}' is inactive", code)))
                }
                None => return Err(Error::InvalidInput(format!("Unknown defect code '{}'", code))),
            }
        }

        for entry in &hours {
            production::upsert_hour(&mut tx, request.id, entry).await?;
        }
        production::touch_record(&mut tx, request.id).await?;

        let record = production::load_record(&mut tx, request.id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Record {} vanished mid-update", request.id)))?;

        tx.commit().await?;

        info!(
            record_id = %record.id,
            hours = hours.len(),
            "Hourly production recorded"
        );

        self.event_bus.emit_lossy(GfptEvent::HourlyProductionRecorded {
            record_id: record.id,
            hours: hours.iter().map(|h| h.hour.clone()).collect(),
            timestamp: time::now(),
        });

        if let Err(e) = self.sync_operator_score(&record).await {
            warn!(record_id = %record.id, error = %e, "Operator score sync failed");
        }

        Ok(record)
    }

    /// Raise the operator's per-process scores from this record's hours
    ///
    /// Each process is offered its best hour once, so a batch raising a
    /// score twice leaves a single history entry.
    pub async fn sync_operator_score(&self, record: &ProductionRecord) -> Result<Vec<ScoreChange>> {
        let mut changes = Vec::new();
        for (process, best) in best_per_process(record) {
            if let Some(change) = operators::offer_score(
                &self.db,
                record.operator.id,
                &process,
                best,
                &record.line,
                record.date,
            )
            .await?
            {
                changes.push(change);
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hour(label: &str, count: i64, defects: &[(&str, i64)]) -> HourlyEntry {
        HourlyEntry {
            hour: label.to_string(),
            process: None,
            production_count: count,
            defects: defects
                .iter()
                .map(|(code, count)| DefectCount {
                    defect_code: code.to_string(),
                    count: *count,
                })
                .collect(),
        }
    }

    #[test]
    fn test_repeated_defect_codes_are_summed() {
        let hours = normalize_hours(&[hour("08-09", 50, &[("D1", 2), ("D2", 1), ("D1", 3)])]).unwrap();
        assert_eq!(
            hours[0].defects,
            vec![
                DefectCount { defect_code: "D1".to_string(), count: 5 },
                DefectCount { defect_code: "D2".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_duplicate_hour_rejected() {
        let result = normalize_hours(&[hour("08-09", 50, &[]), hour(" 08-09 ", 10, &[])]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_negative_counts_rejected() {
        assert!(normalize_hours(&[hour("08-09", -1, &[])]).is_err());
        assert!(normalize_hours(&[hour("08-09", 10, &[("D1", -2)])]).is_err());
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(normalize_hours(&[]).is_err());
    }

    #[test]
    fn test_best_per_process_uses_override() {
        let mut record_hours = vec![hour("08-09", 40, &[]), hour("09-10", 55, &[])];
        record_hours.push(HourlyEntry {
            process: Some("button-attach".to_string()),
            ..hour("10-11", 70, &[])
        });

        let record = ProductionRecord {
            id: Uuid::new_v4(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            operator: crate::models::OperatorSnapshot {
                id: Uuid::new_v4(),
                external_id: "OP-001".to_string(),
                name: "Rahima Khatun".to_string(),
                designation: "operator".to_string(),
            },
            supervisor: "Karim".to_string(),
            floor: "F1".to_string(),
            line: "L1".to_string(),
            buyer_id: "B-10".to_string(),
            style_id: "ST-77".to_string(),
            job_id: None,
            process: "sewing-collar".to_string(),
            machine_id: None,
            work_as: crate::models::WorkAs::Operator,
            target: 500,
            hourly_production: record_hours,
            previous_line_working_time: 0,
            row_no: 1,
            state: crate::models::RecordState::Live,
        };

        let best = best_per_process(&record);
        assert_eq!(best.get("sewing-collar"), Some(&55));
        assert_eq!(best.get("button-attach"), Some(&70));
    }
}
