//! Machine servicing poll
//!
//! On each tick every active part whose next service date has arrived gets
//! a notification, unless it already has one nobody has looked at. New
//! notifications are broadcast as [`GfptEvent::ServiceDue`].

use chrono::NaiveDate;
use gfpt_common::{time, EventBus, GfptEvent, Result};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db::notifications;
use crate::models::{MachinePart, ServiceNotification};

fn due_message(part: &MachinePart) -> String {
    format!(
        "Machine {}: {} service due on {}",
        part.machine_id, part.part_name, part.next_service_date
    )
}

/// Raise notifications for parts due on or before `today`
///
/// Safe to run repeatedly: a part with an unseen notification is skipped.
/// Returns only the notifications created by this run.
pub async fn run_servicing_scan(
    pool: &SqlitePool,
    event_bus: &EventBus,
    today: NaiveDate,
) -> Result<Vec<ServiceNotification>> {
    let parts = notifications::overdue_parts(pool, today).await?;
    let mut created = Vec::new();

    for part in &parts {
        if let Some(notification) =
            notifications::insert_if_absent(pool, part, &due_message(part)).await?
        {
            event_bus.emit_lossy(GfptEvent::ServiceDue {
                notification_id: notification.id,
                machine_id: part.machine_id.clone(),
                part_name: part.part_name.clone(),
                message: notification.message.clone(),
                timestamp: notification.created_at,
            });
            created.push(notification);
        }
    }

    debug!(due = parts.len(), created = created.len(), "Servicing scan complete");
    Ok(created)
}

/// Run the scan every `interval` until `cancel` fires
///
/// The first scan runs immediately. A failed scan is logged and retried on
/// the next tick.
pub fn spawn_servicing_poll(
    pool: SqlitePool,
    event_bus: EventBus,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Servicing poll started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Servicing poll stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match run_servicing_scan(&pool, &event_bus, time::today()).await {
                        Ok(created) if !created.is_empty() => {
                            info!(count = created.len(), "Service notifications raised");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Servicing scan failed"),
                    }
                }
            }
        }
    })
}
