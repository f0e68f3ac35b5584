//! Report response types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Severity, WorkAs};

/// Achievement as a percentage of target, rounded to two decimals
///
/// A zero target yields 0 rather than dividing by zero.
pub fn achievement_percentage(achievement: i64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    let raw = achievement as f64 * 100.0 / target as f64;
    (raw * 100.0).round() / 100.0
}

/// Target vs. achievement for one grouping key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionSummary {
    pub total_target: i64,
    pub total_achievement: i64,
    pub percentage: f64,
}

impl ProductionSummary {
    pub fn new(total_target: i64, total_achievement: i64) -> Self {
        Self {
            total_target,
            total_achievement,
            percentage: achievement_percentage(total_achievement, total_target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProduction {
    pub floor: String,
    pub line: String,
    pub records: i64,
    #[serde(flatten)]
    pub summary: ProductionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineWiseReport {
    pub date: NaiveDate,
    pub lines: Vec<LineProduction>,
    pub overall: ProductionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorProduction {
    pub floor: String,
    pub lines: i64,
    pub records: i64,
    #[serde(flatten)]
    pub summary: ProductionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorWiseReport {
    pub date: NaiveDate,
    pub floors: Vec<FloorProduction>,
    pub overall: ProductionSummary,
}

/// One hour in which a defect was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectOccurrence {
    pub date: NaiveDate,
    pub hour: String,
    pub line: String,
    pub process: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectGroup {
    pub defect_code: String,
    pub defect_name: String,
    pub severity: Option<Severity>,
    pub total: i64,
    pub occurrences: Vec<DefectOccurrence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDefectTotal {
    pub date: NaiveDate,
    pub production: i64,
    pub defects: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDefectReport {
    pub operator_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_production: i64,
    pub total_defects: i64,
    /// Defects per 100 produced pieces
    pub defect_rate: f64,
    pub defects: Vec<DefectGroup>,
    pub daily: Vec<DailyDefectTotal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub operator_id: String,
    pub name: String,
    pub designation: String,
    pub status: AttendanceStatus,
    pub work_as: Option<WorkAs>,
    pub floor: Option<String>,
    pub line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub date: NaiveDate,
    pub total_operators: i64,
    pub present: i64,
    pub absent: i64,
    pub operators: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMismatch {
    pub operator_id: String,
    pub name: String,
    pub designation: String,
    pub work_as: WorkAs,
    pub floor: String,
    pub line: String,
}

/// Total produced on one record for one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub record_id: Uuid,
    pub date: NaiveDate,
    pub line: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighestAchievements {
    pub operator_id: String,
    pub process: String,
    pub highest: Option<Achievement>,
    pub second_highest: Option<Achievement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_exact() {
        assert_eq!(achievement_percentage(165, 500), 33.0);
        assert_eq!(achievement_percentage(500, 500), 100.0);
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(achievement_percentage(1, 3), 33.33);
        assert_eq!(achievement_percentage(2, 3), 66.67);
    }

    #[test]
    fn test_percentage_zero_target() {
        assert_eq!(achievement_percentage(120, 0), 0.0);
    }

    #[test]
    fn test_line_production_flattens_summary() {
        let row = LineProduction {
            floor: "F1".to_string(),
            line: "L1".to_string(),
            records: 2,
            summary: ProductionSummary::new(1000, 250),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["totalTarget"], 1000);
        assert_eq!(json["totalAchievement"], 250);
        assert_eq!(json["percentage"], 25.0);
    }
}
