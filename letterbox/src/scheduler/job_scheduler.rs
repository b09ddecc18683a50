//! In-process wake-up scheduler
//!
//! Each notification slot maps to one one-shot job on a
//! `tokio_cron_scheduler::JobScheduler`. Fired alarms are published on a
//! broadcast channel; whatever renders notifications subscribes to it.
//! All state is in memory, so a restart loses every pending alarm.

use super::{ReminderPayload, WakeUpScheduler};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

const DELIVERY_CHANNEL_CAPACITY: usize = 64;

/// Wake-up scheduler backed by `tokio-cron-scheduler`
#[derive(Clone)]
pub struct JobWakeUpScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    slots: Arc<Mutex<HashMap<i64, Uuid>>>,
    deliveries: broadcast::Sender<ReminderPayload>,
}

impl JobWakeUpScheduler {
    /// Create new scheduler service
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;
        let (deliveries, _) = broadcast::channel(DELIVERY_CHANNEL_CAPACITY);

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            slots: Arc::new(Mutex::new(HashMap::new())),
            deliveries,
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Wake-up scheduler started");
        Ok(())
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Wake-up scheduler shutdown");
        Ok(())
    }

    /// Receive every delivered reminder from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ReminderPayload> {
        self.deliveries.subscribe()
    }

    /// Slots that currently hold a pending alarm, ascending
    pub async fn pending_slots(&self) -> Vec<i64> {
        let mut slots: Vec<i64> = self.slots.lock().await.keys().copied().collect();
        slots.sort_unstable();
        slots
    }
}

fn deliver(deliveries: &broadcast::Sender<ReminderPayload>, payload: ReminderPayload) {
    let reminder_id = payload.reminder_id.clone();
    match deliveries.send(payload) {
        Ok(receivers) => {
            tracing::info!("Delivered reminder {} to {} receiver(s)", reminder_id, receivers)
        }
        Err(_) => tracing::warn!("Reminder {} fired with no receivers", reminder_id),
    }
}

#[async_trait]
impl WakeUpScheduler for JobWakeUpScheduler {
    async fn schedule(
        &self,
        notification_id: i64,
        fire_at: DateTime<Utc>,
        payload: ReminderPayload,
    ) -> Result<()> {
        self.cancel(notification_id).await?;

        let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let deliveries = self.deliveries.clone();
        let slots = Arc::clone(&self.slots);

        let job = Job::new_one_shot_async(delay, move |job_id, _l| {
            let deliveries = deliveries.clone();
            let slots = Arc::clone(&slots);
            let payload = payload.clone();
            Box::pin(async move {
                {
                    let mut slots = slots.lock().await;
                    if slots.get(&notification_id) == Some(&job_id) {
                        slots.remove(&notification_id);
                    }
                }
                deliver(&deliveries, payload);
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create alarm job: {}", e)))?;

        let job_id = job.guid();

        // Claim the slot before the job can possibly fire
        self.slots.lock().await.insert(notification_id, job_id);

        let scheduler = self.scheduler.read().await;
        if let Err(e) = scheduler.add(job).await {
            self.slots.lock().await.remove(&notification_id);
            return Err(AppError::Scheduler(format!("Failed to schedule alarm: {}", e)));
        }

        tracing::debug!("Scheduled slot {} for {}", notification_id, fire_at);
        Ok(())
    }

    async fn cancel(&self, notification_id: i64) -> Result<()> {
        let job_id = self.slots.lock().await.remove(&notification_id);

        if let Some(job_id) = job_id {
            let scheduler = self.scheduler.read().await;
            // A job that fired between the lookup and here is already gone
            if let Err(e) = scheduler.remove(&job_id).await {
                tracing::warn!("Failed to remove alarm job for slot {}: {}", notification_id, e);
            }
            tracing::debug!("Cancelled slot {}", notification_id);
        }

        Ok(())
    }

    async fn send(&self, payload: ReminderPayload) -> Result<()> {
        deliver(&self.deliveries, payload);
        Ok(())
    }
}
