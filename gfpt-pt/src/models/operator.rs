//! Operator registry model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Where an operator was last scanned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastScan {
    pub process: Option<String>,
    pub machine_id: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub designation: String,
    /// Best observed count per hour, keyed by process name
    pub process_scores: HashMap<String, i64>,
    pub last_scan: Option<LastScan>,
    pub created_at: DateTime<Utc>,
}

/// A score that was superseded by a higher observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryEntry {
    pub process_name: String,
    pub previous_score: i64,
    pub new_score: i64,
    pub line: String,
    pub date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of offering one observation to the score ratchet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreChange {
    pub process_name: String,
    /// `None` when the operator had no score for this process yet
    pub previous_score: Option<i64>,
    pub new_score: i64,
}

/// Decide whether `observed` replaces `stored`
///
/// Scores only move up: a strictly greater observation wins, anything else
/// leaves the stored value alone.
pub fn ratchet(stored: Option<i64>, observed: i64) -> Option<i64> {
    match stored {
        Some(current) if observed > current => Some(observed),
        None if observed > 0 => Some(observed),
        _ => None,
    }
}
