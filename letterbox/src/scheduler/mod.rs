//! Wake-up scheduling
//!
//! Reminders are delivered through an OS-style alarm service addressed by an
//! integer notification slot. Alarms survive neither a device reboot nor a
//! clock change, which is why the rehydration service exists.

pub mod job_scheduler;

pub use job_scheduler::JobWakeUpScheduler;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a fired alarm shows to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub reminder_id: String,
    pub title: String,
    pub description: Option<String>,
}

/// One-shot alarm service keyed by notification slot
#[async_trait]
pub trait WakeUpScheduler: Send + Sync {
    /// Arrange for `payload` to be delivered at `fire_at`. Scheduling an
    /// occupied slot replaces the previous alarm. Times in the past fire
    /// immediately.
    async fn schedule(
        &self,
        notification_id: i64,
        fire_at: DateTime<Utc>,
        payload: ReminderPayload,
    ) -> Result<()>;

    /// Drop the alarm in `notification_id`, if any
    async fn cancel(&self, notification_id: i64) -> Result<()>;

    /// Deliver `payload` right now
    async fn send(&self, payload: ReminderPayload) -> Result<()>;
}
