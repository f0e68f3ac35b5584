//! Read-only reports over the production and history stores

use chrono::NaiveDate;
use gfpt_common::{time, Error, Result};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};

use super::require;
use crate::db::production::RecordFilter;
use crate::db::{defects, history, operators, production, reports};
use crate::models::report::{
    achievement_percentage, Achievement, AttendanceReport, AttendanceStatus, DailyDefectTotal,
    DefectGroup, DefectOccurrence, FloorWiseReport, HighestAchievements, LineWiseReport,
    OperatorDefectReport, ProductionSummary, RoleMismatch,
};
use crate::models::{Defect, ProductionRecord, ScoreHistoryEntry, WorkAs};

pub struct ReportingService {
    db: SqlitePool,
}

impl ReportingService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn line_wise(
        &self,
        date: &str,
        floor: Option<&str>,
        supervisor: Option<&str>,
    ) -> Result<LineWiseReport> {
        let date = time::parse_day(date)?;
        let lines = reports::line_totals(&self.db, date, floor, supervisor).await?;

        let overall = ProductionSummary::new(
            lines.iter().map(|l| l.summary.total_target).sum(),
            lines.iter().map(|l| l.summary.total_achievement).sum(),
        );

        Ok(LineWiseReport { date, lines, overall })
    }

    pub async fn floor_wise(&self, date: &str) -> Result<FloorWiseReport> {
        let date = time::parse_day(date)?;
        let floors = reports::floor_totals(&self.db, date).await?;

        let overall = ProductionSummary::new(
            floors.iter().map(|f| f.summary.total_target).sum(),
            floors.iter().map(|f| f.summary.total_achievement).sum(),
        );

        Ok(FloorWiseReport { date, floors, overall })
    }

    /// Defects of one operator over an inclusive date range
    ///
    /// Covers live records and segments left behind by line transfers.
    pub async fn operator_defects(
        &self,
        operator_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<OperatorDefectReport> {
        require("operatorId", operator_id)?;
        let operator_id = operator_id.trim();
        let (start, end) = time::parse_day_range(start_date, end_date)?;

        let filter = RecordFilter {
            start: Some(start),
            end: Some(end),
            operator_external_id: Some(operator_id.to_string()),
            ..RecordFilter::default()
        };
        let mut records = production::list_records(&self.db, &filter).await?;
        records.extend(history::list_history(&self.db, operator_id, Some(start), Some(end)).await?);

        let catalog = defects::catalog(&self.db).await?;

        Ok(summarize_defects(operator_id, start, end, &records, &catalog))
    }

    pub async fn attendance(&self, date: &str) -> Result<AttendanceReport> {
        let date = time::parse_day(date)?;
        let operators = reports::attendance_rows(&self.db, date).await?;

        let present = operators
            .iter()
            .filter(|o| o.status == AttendanceStatus::Present)
            .count() as i64;
        let total = operators.len() as i64;

        Ok(AttendanceReport {
            date,
            total_operators: total,
            present,
            absent: total - present,
            operators,
        })
    }

    pub async fn role_mismatch(
        &self,
        date: &str,
        designation: Option<&str>,
        work_as: Option<&str>,
    ) -> Result<Vec<RoleMismatch>> {
        let date = time::parse_day(date)?;
        let work_as = work_as
            .map(|w| {
                WorkAs::parse(w).ok_or_else(|| {
                    Error::InvalidInput(format!("workAs must be 'operator' or 'helper', got '{}'", w))
                })
            })
            .transpose()?;

        reports::role_mismatches(&self.db, date, designation, work_as).await
    }

    /// Two best record totals for an operator on a process
    pub async fn highest_achievements(
        &self,
        operator_id: &str,
        process: &str,
    ) -> Result<HighestAchievements> {
        require("operatorId", operator_id)?;
        require("process", process)?;
        let operator_id = operator_id.trim();
        let process = process.trim();

        let filter = RecordFilter {
            operator_external_id: Some(operator_id.to_string()),
            ..RecordFilter::default()
        };
        let mut records = production::list_records(&self.db, &filter).await?;
        records.extend(history::list_history(&self.db, operator_id, None, None).await?);

        let mut top = top_achievements(&records, process).into_iter();

        Ok(HighestAchievements {
            operator_id: operator_id.to_string(),
            process: process.to_string(),
            highest: top.next(),
            second_highest: top.next(),
        })
    }

    pub async fn score_history(&self, external_id: &str) -> Result<Vec<ScoreHistoryEntry>> {
        let mut conn = self.db.acquire().await?;
        let operator = operators::find_by_external_id(&mut conn, external_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Operator '{}' not found", external_id)))?;
        drop(conn);

        operators::score_history(&self.db, operator.id).await
    }
}

/// Fold records into a defect report
///
/// Codes missing from the catalog are reported under their raw code with no
/// severity.
pub fn summarize_defects(
    operator_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    records: &[ProductionRecord],
    catalog: &HashMap<String, Defect>,
) -> OperatorDefectReport {
    let mut groups: BTreeMap<String, DefectGroup> = BTreeMap::new();
    let mut daily: BTreeMap<NaiveDate, DailyDefectTotal> = BTreeMap::new();
    let mut total_production = 0;
    let mut total_defects = 0;

    for record in records {
        let produced = record.achievement();
        let defective = record.defect_total();
        total_production += produced;
        total_defects += defective;

        let day = daily.entry(record.date).or_insert(DailyDefectTotal {
            date: record.date,
            production: 0,
            defects: 0,
        });
        day.production += produced;
        day.defects += defective;

        for entry in &record.hourly_production {
            for defect in &entry.defects {
                let group = groups
                    .entry(defect.defect_code.clone())
                    .or_insert_with(|| {
                        let known = catalog.get(&defect.defect_code);
                        DefectGroup {
                            defect_code: defect.defect_code.clone(),
                            defect_name: known
                                .map(|d| d.name.clone())
                                .unwrap_or_else(|| defect.defect_code.clone()),
                            severity: known.map(|d| d.severity),
                            total: 0,
                            occurrences: Vec::new(),
                        }
                    });
                group.total += defect.count;
                group.occurrences.push(DefectOccurrence {
                    date: record.date,
                    hour: entry.hour.clone(),
                    line: record.line.clone(),
                    process: entry.process_or(&record.process).to_string(),
                    count: defect.count,
                });
            }
        }
    }

    let mut defects: Vec<DefectGroup> = groups.into_values().collect();
    defects.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.defect_code.cmp(&b.defect_code)));
    for group in &mut defects {
        group.occurrences.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.hour.cmp(&b.hour)));
    }

    OperatorDefectReport {
        operator_id: operator_id.to_string(),
        start_date: start,
        end_date: end,
        total_production,
        total_defects,
        defect_rate: achievement_percentage(total_defects, total_production),
        defects,
        daily: daily.into_values().collect(),
    }
}

/// Per-record totals for `process`, best first, at most two
pub fn top_achievements(records: &[ProductionRecord], process: &str) -> Vec<Achievement> {
    let mut totals: Vec<Achievement> = records
        .iter()
        .filter_map(|record| {
            let mut matched = false;
            let total: i64 = record
                .hourly_production
                .iter()
                .filter(|h| h.process_or(&record.process) == process)
                .inspect(|_| matched = true)
                .map(|h| h.production_count)
                .sum();

            matched.then(|| Achievement {
                record_id: record.id,
                date: record.date,
                line: record.line.clone(),
                total,
            })
        })
        .collect();

    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| b.date.cmp(&a.date)));
    totals.truncate(2);
    totals
}
