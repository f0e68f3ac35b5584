//! Production records: the live daily entry and its historized snapshots
//!
//! Both live and historized records share [`ProductionRecord`]; the
//! [`RecordState`] tag says which store the record came from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role an operator works in on a given record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkAs {
    Operator,
    Helper,
}

impl WorkAs {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkAs::Operator => "operator",
            WorkAs::Helper => "helper",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "operator" => Some(WorkAs::Operator),
            "helper" => Some(WorkAs::Helper),
            _ => None,
        }
    }
}

/// Why a record left the live store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    LineChange,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::LineChange => "line_change",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "line_change" => Some(HistoryAction::LineChange),
            _ => None,
        }
    }
}

/// Operator identity copied onto the record at entry time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSnapshot {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub designation: String,
}

/// Occurrences of one catalog defect within an hour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectCount {
    pub defect_code: String,
    pub count: i64,
}

/// Output of one working hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyEntry {
    pub hour: String,
    /// Process worked this hour when it differs from the record's process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    pub production_count: i64,
    #[serde(default)]
    pub defects: Vec<DefectCount>,
}

impl HourlyEntry {
    pub fn defect_total(&self) -> i64 {
        self.defects.iter().map(|d| d.count).sum()
    }

    /// Process this hour's output counts toward
    pub fn process_or<'a>(&'a self, record_process: &'a str) -> &'a str {
        self.process.as_deref().unwrap_or(record_process)
    }
}

/// Store a record was read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordState {
    Live,
    #[serde(rename_all = "camelCase")]
    Historized {
        history_id: Uuid,
        action: HistoryAction,
        moved_to_line: String,
        transferred_by: String,
        historized_at: DateTime<Utc>,
    },
}

/// One operator's production on one line for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub operator: OperatorSnapshot,
    pub supervisor: String,
    pub floor: String,
    pub line: String,
    pub buyer_id: String,
    pub style_id: String,
    pub job_id: Option<String>,
    pub process: String,
    pub machine_id: Option<String>,
    pub work_as: WorkAs,
    pub target: i64,
    pub hourly_production: Vec<HourlyEntry>,
    /// Minutes carried from an earlier line the same day. On a historized
    /// record this is the net time banked for the line that was left.
    pub previous_line_working_time: i64,
    pub row_no: i64,
    pub state: RecordState,
}

impl ProductionRecord {
    /// Sum of hourly produced counts
    pub fn achievement(&self) -> i64 {
        self.hourly_production.iter().map(|h| h.production_count).sum()
    }

    /// Sum of defect counts over all hours
    pub fn defect_total(&self) -> i64 {
        self.hourly_production.iter().map(|h| h.defect_total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ProductionRecord {
        ProductionRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            operator: OperatorSnapshot {
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
            machine_id: Some("M-100".to_string()),
            work_as: WorkAs::Operator,
            target: 500,
            hourly_production: Vec::new(),
            previous_line_working_time: 0,
            row_no: 1,
            state: RecordState::Live,
        }
    }

    fn hour(label: &str, count: i64) -> HourlyEntry {
        HourlyEntry {
            hour: label.to_string(),
            process: None,
            production_count: count,
            defects: Vec::new(),
        }
    }

    #[test]
    fn test_achievement_sums_hours() {
        let mut record = sample_record();
        assert_eq!(record.achievement(), 0);

        record.hourly_production = vec![hour("1", 50), hour("2", 65), hour("3", 55)];
        assert_eq!(record.achievement(), 170);
    }

    #[test]
    fn test_defect_total_sums_all_hours() {
        let mut record = sample_record();
        let mut first = hour("1", 40);
        first.defects = vec![
            DefectCount { defect_code: "D01".to_string(), count: 2 },
            DefectCount { defect_code: "D02".to_string(), count: 1 },
        ];
        let mut second = hour("2", 40);
        second.defects = vec![DefectCount { defect_code: "D01".to_string(), count: 4 }];
        record.hourly_production = vec![first, second];

        assert_eq!(record.defect_total(), 7);
    }

    #[test]
    fn test_hour_process_override() {
        let mut entry = hour("1", 10);
        assert_eq!(entry.process_or("sewing-collar"), "sewing-collar");
        entry.process = Some("hemming".to_string());
        assert_eq!(entry.process_or("sewing-collar"), "hemming");
    }

    #[test]
    fn test_work_as_parse() {
        assert_eq!(WorkAs::parse("Operator"), Some(WorkAs::Operator));
        assert_eq!(WorkAs::parse(" helper "), Some(WorkAs::Helper));
        assert_eq!(WorkAs::parse("manager"), None);
    }

    #[test]
    fn test_state_serialization() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"]["status"], "live");
        assert_eq!(json["operator"]["externalId"], "OP-001");
        assert_eq!(json["workAs"], "operator");

        let historized = RecordState::Historized {
            history_id: Uuid::new_v4(),
            action: HistoryAction::LineChange,
            moved_to_line: "L2".to_string(),
            transferred_by: "supervisor-1".to_string(),
            historized_at: Utc::now(),
        };
        let json = serde_json::to_value(&historized).unwrap();
        assert_eq!(json["status"], "historized");
        assert_eq!(json["action"], "line_change");
        assert_eq!(json["movedToLine"], "L2");
    }
}
