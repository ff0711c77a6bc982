//! Background reminder scanner
//!
//! Periodically announces overdue reminders on the event bus (one
//! `ReminderDue` per reminder, ever) and purges expired sessions.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vettrack_common::events::{EventBus, VetEvent};
use vettrack_common::{time, Result};

use crate::db::{reminders, sessions};

/// One scan pass; returns the number of reminders announced
pub async fn scan_due_reminders(
    pool: &SqlitePool,
    event_bus: &EventBus,
    now: DateTime<Utc>,
) -> Result<usize> {
    let due = reminders::due_unnotified(pool, now).await?;

    for item in &due {
        event_bus.emit_lossy(VetEvent::ReminderDue {
            reminder_id: item.reminder.id,
            pet_id: item.reminder.pet_id,
            user_id: item.user_id,
            pet_name: item.pet_name.clone(),
            title: item.reminder.title.clone(),
            due_date: item.reminder.due_date,
        });
        reminders::mark_notified(pool, item.reminder.id, now).await?;
    }

    if !due.is_empty() {
        info!(count = due.len(), "Announced due reminders");
    }

    let purged = sessions::purge_expired(pool, now).await?;
    if purged > 0 {
        debug!(purged, "Removed expired sessions");
    }

    Ok(due.len())
}

/// Run [`scan_due_reminders`] every `interval` until the runtime shuts down
pub fn spawn_reminder_scanner(
    pool: SqlitePool,
    event_bus: EventBus,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Reminder scanner started (every {:?})", interval);

        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            if let Err(e) = scan_due_reminders(&pool, &event_bus, time::now()).await {
                warn!("Reminder scan failed: {}", e);
            }
        }
    })
}
