//! Production services
//!
//! Each service owns a pool handle and the event bus; HTTP handlers build
//! one per request from [`crate::AppState`].

pub mod daily_entry;
pub mod hourly_update;
pub mod line_transfer;
pub mod reporting;
pub mod servicing;

pub use daily_entry::{CreateEntryRequest, DailyEntryService};
pub use hourly_update::{HourlyUpdateRequest, HourlyUpdateService};
pub use line_transfer::{LineTransferService, TransferOutcome, TransferRequest};
pub use reporting::ReportingService;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::db;

/// Update an operator's last-known scan location in the background
///
/// Failures are logged and never reach the request that triggered the
/// update. The handle is returned so tests can await completion.
pub fn spawn_last_scan_update(
    pool: SqlitePool,
    external_id: String,
    process: Option<String>,
    machine_id: Option<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match db::operators::update_last_scan(
            &pool,
            &external_id,
            process.as_deref(),
            machine_id.as_deref(),
            Utc::now(),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => warn!(operator_id = %external_id, "Last scan update found no operator"),
            Err(e) => warn!(operator_id = %external_id, error = %e, "Last scan update failed"),
        }
    })
}

/// Reject blank required text fields
pub(crate) fn require(field: &str, value: &str) -> gfpt_common::Result<()> {
    if value.trim().is_empty() {
        return Err(gfpt_common::Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}
