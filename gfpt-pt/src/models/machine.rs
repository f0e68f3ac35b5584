//! Machines, their serviceable parts and servicing notifications

use chrono::{DateTime, Days, NaiveDate, Utc};
use gfpt_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub machine_id: String,
    pub machine_type: String,
    pub floor: Option<String>,
    pub line: Option<String>,
    pub active: bool,
    pub parts: Vec<MachinePart>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePart {
    pub id: Uuid,
    pub machine_id: String,
    pub part_name: String,
    pub service_interval_days: i64,
    pub last_serviced: NaiveDate,
    pub next_service_date: NaiveDate,
    pub active: bool,
}

/// Next service date for a part serviced on `last_serviced`
///
/// Intervals that run past the calendar range are rejected.
pub fn next_service_date(last_serviced: NaiveDate, interval_days: i64) -> Result<NaiveDate> {
    u64::try_from(interval_days)
        .ok()
        .and_then(|days| last_serviced.checked_add_days(Days::new(days)))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "serviceIntervalDays {} puts the next service out of range",
                interval_days
            ))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNotification {
    pub id: Uuid,
    pub part_id: Uuid,
    pub machine_id: String,
    pub message: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}
