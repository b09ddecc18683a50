//! Rehydration service
//!
//! The wake-up scheduler forgets everything on reboot or when the system
//! clock changes. This replays every unacknowledged reminder from the
//! database. It only ever schedules, never cancels, so running it twice is
//! harmless.
//!
//! Not safe to run concurrently with reminder edits.

use crate::config::OVERDUE_STAGGER_MINUTES;
use crate::database::Repository;
use crate::error::Result;
use crate::scheduler::WakeUpScheduler;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one rehydration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RehydrationReport {
    /// Past-due reminders re-armed on a staggered schedule
    pub overdue: usize,
    /// Future reminders re-armed at their own time
    pub upcoming: usize,
    /// Reminders the scheduler refused
    pub failed: usize,
}

#[derive(Clone)]
pub struct RehydrationService {
    repo: Repository,
    scheduler: Arc<dyn WakeUpScheduler>,
}

impl RehydrationService {
    pub fn new(repo: Repository, scheduler: Arc<dyn WakeUpScheduler>) -> Self {
        Self { repo, scheduler }
    }

    /// Re-arm every pending reminder relative to `now`.
    ///
    /// Overdue reminders fire one per minute starting a minute from now
    /// instead of all at once. A reminder the scheduler rejects is logged
    /// and skipped so the rest still get armed.
    pub async fn rehydrate(&self, now: DateTime<Utc>) -> Result<RehydrationReport> {
        let pending = self.repo.list_pending_reminders().await?;

        tracing::info!("Rehydrating {} pending reminder(s)", pending.len());

        let (overdue, upcoming): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|r| r.scheduled_for <= now);

        let staggered = overdue.iter().enumerate().map(|(i, reminder)| {
            let offset = Duration::minutes(OVERDUE_STAGGER_MINUTES * (i as i64 + 1));
            (reminder, now + offset)
        });
        let on_time = upcoming.iter().map(|reminder| (reminder, reminder.scheduled_for));

        let mut report = RehydrationReport {
            overdue: overdue.len(),
            upcoming: upcoming.len(),
            failed: 0,
        };

        for (reminder, fire_at) in staggered.chain(on_time) {
            if let Err(e) = self
                .scheduler
                .schedule(reminder.notification_id, fire_at, reminder.into())
                .await
            {
                tracing::error!("Failed to re-arm reminder {}: {}", reminder.id, e);
                report.failed += 1;
            }
        }

        tracing::info!("Rehydration complete: {:?}", report);
        Ok(report)
    }
}
