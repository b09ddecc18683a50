//! Reminders service
//!
//! Saves reminders, reconciles the letters they tag and keeps the wake-up
//! scheduler in step with the stored rows.
//!
//! Alarm calls cannot join the database transaction. The old alarm is
//! cancelled before the transaction opens and the new one is scheduled after
//! it commits. If the transaction fails in between, the reminder stays
//! silent until it is saved again or the next rehydration pass.

use crate::database::{
    Reminder, ReminderDetails, ReminderFields, Repository, UpsertReminderRequest,
};
use crate::error::{AppError, Result};
use crate::ids::validate_id;
use crate::scheduler::{ReminderPayload, WakeUpScheduler};
use crate::services::reconcile::SetDiff;
use chrono::{DateTime, Utc};
use std::sync::Arc;

impl From<&Reminder> for ReminderPayload {
    fn from(reminder: &Reminder) -> Self {
        Self {
            reminder_id: reminder.id.clone(),
            title: reminder.title.clone(),
            description: reminder.description.clone(),
        }
    }
}

/// Service for saving, acknowledging and deleting reminders
#[derive(Clone)]
pub struct RemindersService {
    repo: Repository,
    scheduler: Arc<dyn WakeUpScheduler>,
}

impl RemindersService {
    pub fn new(repo: Repository, scheduler: Arc<dyn WakeUpScheduler>) -> Self {
        Self { repo, scheduler }
    }

    /// Make the stored reminder match `req` and (re)arm its alarm.
    ///
    /// An acknowledged reminder stays acknowledged and is not re-armed.
    pub async fn upsert_reminder(
        &self,
        req: UpsertReminderRequest,
        now: DateTime<Utc>,
    ) -> Result<Reminder> {
        validate_id(&req.id)?;
        for id in &req.letters {
            validate_id(id)?;
        }

        let title = req.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Reminder title cannot be empty".to_string()));
        }

        tracing::info!("Saving reminder {} for {}", req.id, req.scheduled_for);

        let existing = self.repo.get_reminder(&req.id).await?;

        if let Some(existing) = &existing {
            self.scheduler.cancel(existing.notification_id).await?;
        }

        let mut tx = self.repo.begin().await?;

        let notification_id = match &existing {
            Some(existing) => existing.notification_id,
            None => Repository::next_notification_id(&mut tx).await?,
        };

        let fields = ReminderFields {
            id: &req.id,
            title,
            description: req.description.as_deref(),
            scheduled_for: req.scheduled_for,
            notification_id,
        };
        let saved = Repository::upsert_reminder_row(&mut tx, &fields, now).await?;

        let existing_letters = Repository::letter_ids_for_reminder(&mut tx, &req.id).await?;
        let letters = SetDiff::between(&existing_letters, &req.letters);

        for letter_id in &letters.to_remove {
            Repository::unlink_letter(&mut tx, &req.id, letter_id).await?;
        }
        for letter_id in &letters.to_add {
            Repository::link_letter(&mut tx, &req.id, letter_id).await?;
        }

        tx.commit().await?;

        if saved.acknowledged {
            tracing::debug!("Reminder {} is acknowledged, not re-arming", saved.id);
        } else {
            self.scheduler
                .schedule(saved.notification_id, saved.scheduled_for, (&saved).into())
                .await?;
        }

        tracing::info!(
            "Reminder saved: {} (slot {}, +{} -{} letters)",
            saved.id,
            saved.notification_id,
            letters.to_add.len(),
            letters.to_remove.len()
        );

        Ok(saved)
    }

    /// Silence a reminder's alarm and mark it as handled.
    /// Unknown or already acknowledged reminders are left alone.
    ///
    /// The alarm is cancelled before the flag is written, so a failed
    /// cancel leaves the reminder pending and a retry cancels again.
    pub async fn acknowledge(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let Some(reminder) = self.repo.get_reminder(id).await? else {
            tracing::debug!("Acknowledge of unknown reminder {} ignored", id);
            return Ok(());
        };

        if reminder.acknowledged {
            return Ok(());
        }

        self.scheduler.cancel(reminder.notification_id).await?;

        if self.repo.acknowledge_reminder(id, now).await? > 0 {
            tracing::info!("Reminder acknowledged: {}", id);
        }

        Ok(())
    }

    /// Cancel a reminder's alarm and delete it with its letter links.
    /// Deleting a reminder that does not exist succeeds.
    pub async fn delete_reminder(&self, id: &str) -> Result<()> {
        let Some(reminder) = self.repo.get_reminder(id).await? else {
            tracing::debug!("Reminder {} already gone", id);
            return Ok(());
        };

        self.scheduler.cancel(reminder.notification_id).await?;

        let mut tx = self.repo.begin().await?;
        Repository::delete_reminder_row(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!("Reminder deleted: {}", id);
        Ok(())
    }

    /// Reminder with the letters it tags
    pub async fn reminder_with_details(&self, id: &str) -> Result<ReminderDetails> {
        let reminder = self
            .repo
            .get_reminder(id)
            .await?
            .ok_or_else(|| AppError::ReminderNotFound(id.to_string()))?;

        Ok(ReminderDetails {
            letters: self.repo.letters_for_reminder(id).await?,
            reminder,
        })
    }

    /// All reminders, soonest first
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.repo.list_reminders().await
    }

    /// Reminders that have not been acknowledged yet
    pub async fn list_pending_reminders(&self) -> Result<Vec<Reminder>> {
        self.repo.list_pending_reminders().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::testing::{RecordingScheduler, SchedulerCall};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    async fn create_test_service() -> (RemindersService, Repository, Arc<RecordingScheduler>) {
        let repo = Repository::new(test_pool().await);
        let scheduler = Arc::new(RecordingScheduler::default());
        let service = RemindersService::new(repo.clone(), scheduler.clone());
        (service, repo, scheduler)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0).unwrap()
    }

    fn request(id: &str, scheduled_for: DateTime<Utc>, letters: &[&str]) -> UpsertReminderRequest {
        UpsertReminderRequest {
            id: id.to_string(),
            title: "Write back".to_string(),
            description: Some("Thank them for the photos".to_string()),
            scheduled_for,
            letters: letters.iter().map(|l| l.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    async fn letter(repo: &Repository, id: &str) {
        let mut tx = repo.begin().await.unwrap();
        Repository::upsert_letter_row(&mut tx, id, None, None, None, at(1))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    async fn tagged(repo: &Repository, reminder_id: &str) -> Vec<String> {
        repo.letters_for_reminder(reminder_id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect()
    }

    #[tokio::test]
    async fn test_create_schedules_after_commit() {
        let (service, repo, scheduler) = create_test_service().await;
        letter(&repo, "l1").await;

        let reminder = service
            .upsert_reminder(request("r1", at(12), &["l1"]), at(9))
            .await
            .unwrap();

        assert_eq!(reminder.notification_id, 1);
        assert!(!reminder.acknowledged);
        assert_eq!(reminder.created_at, at(9));
        assert_eq!(
            scheduler.calls(),
            vec![SchedulerCall::Schedule {
                notification_id: 1,
                fire_at: at(12),
                reminder_id: "r1".to_string(),
            }]
        );
        assert_eq!(tagged(&repo, "r1").await, vec!["l1"]);
    }

    #[tokio::test]
    async fn test_update_cancels_then_reschedules_same_slot() {
        let (service, repo, scheduler) = create_test_service().await;
        for id in ["l1", "l2", "l3"] {
            letter(&repo, id).await;
        }

        service
            .upsert_reminder(request("r1", at(12), &["l1", "l2"]), at(9))
            .await
            .unwrap();
        scheduler.clear();

        let updated = service
            .upsert_reminder(request("r1", at(15), &["l2", "l3"]), at(10))
            .await
            .unwrap();

        assert_eq!(updated.notification_id, 1);
        assert_eq!(updated.created_at, at(9));
        assert_eq!(updated.updated_at, at(10));
        assert_eq!(updated.scheduled_for, at(15));
        assert_eq!(
            scheduler.calls(),
            vec![
                SchedulerCall::Cancel(1),
                SchedulerCall::Schedule {
                    notification_id: 1,
                    fire_at: at(15),
                    reminder_id: "r1".to_string(),
                },
            ]
        );
        assert_eq!(tagged(&repo, "r1").await, vec!["l2", "l3"]);
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_alarm_cancelled() {
        let (service, _repo, scheduler) = create_test_service().await;

        service
            .upsert_reminder(request("r1", at(12), &[]), at(9))
            .await
            .unwrap();
        scheduler.clear();

        // Tagging a letter that does not exist violates a foreign key
        let result = service
            .upsert_reminder(request("r1", at(15), &["missing"]), at(10))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(scheduler.calls(), vec![SchedulerCall::Cancel(1)]);

        let stored = service.reminder_with_details("r1").await.unwrap();
        assert_eq!(stored.reminder.scheduled_for, at(12));
    }

    #[tokio::test]
    async fn test_notification_ids_are_never_reused() {
        let (service, _repo, _scheduler) = create_test_service().await;
        let mut issued = Vec::new();

        for i in 0..6 {
            let id = format!("r{}", i);
            let reminder = service
                .upsert_reminder(request(&id, at(12), &[]), at(9))
                .await
                .unwrap();
            issued.push(reminder.notification_id);

            // Deleting the newest reminder must not free its slot
            if i % 2 == 1 {
                service.delete_reminder(&id).await.unwrap();
            }
        }

        assert!(issued.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(issued, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_acknowledge_is_terminal() {
        let (service, repo, scheduler) = create_test_service().await;

        service
            .upsert_reminder(request("r1", at(12), &[]), at(9))
            .await
            .unwrap();
        scheduler.clear();

        service.acknowledge("r1", at(13)).await.unwrap();
        let first = repo.get_reminder("r1").await.unwrap().unwrap();

        service.acknowledge("r1", at(14)).await.unwrap();
        let second = repo.get_reminder("r1").await.unwrap().unwrap();

        assert!(first.acknowledged);
        assert_eq!(first, second);
        assert_eq!(second.updated_at, at(13));
        assert_eq!(scheduler.cancels(), vec![1]);
    }

    #[tokio::test]
    async fn test_failed_cancel_keeps_reminder_pending() {
        let (service, repo, scheduler) = create_test_service().await;

        service
            .upsert_reminder(request("r1", at(12), &[]), at(9))
            .await
            .unwrap();
        scheduler.clear();
        scheduler.refuse_cancels(true);

        let result = service.acknowledge("r1", at(13)).await;

        assert!(matches!(result, Err(AppError::Scheduler(_))));
        assert!(!repo.get_reminder("r1").await.unwrap().unwrap().acknowledged);

        scheduler.refuse_cancels(false);
        service.acknowledge("r1", at(14)).await.unwrap();

        let reminder = repo.get_reminder("r1").await.unwrap().unwrap();
        assert!(reminder.acknowledged);
        assert_eq!(reminder.updated_at, at(14));
        assert_eq!(scheduler.cancels(), vec![1]);
    }

    #[tokio::test]
    async fn test_resave_keeps_acknowledgement_and_stays_silent() {
        let (service, _repo, scheduler) = create_test_service().await;

        service
            .upsert_reminder(request("r1", at(12), &[]), at(9))
            .await
            .unwrap();
        service.acknowledge("r1", at(13)).await.unwrap();
        scheduler.clear();

        let saved = service
            .upsert_reminder(request("r1", at(20), &[]), at(14))
            .await
            .unwrap();

        assert!(saved.acknowledged);
        assert!(scheduler.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_is_a_no_op() {
        let (service, _repo, scheduler) = create_test_service().await;

        service.acknowledge("ghost", at(9)).await.unwrap();

        assert!(scheduler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cancels_and_unlinks() {
        let (service, repo, scheduler) = create_test_service().await;
        letter(&repo, "l1").await;

        service
            .upsert_reminder(request("r1", at(12), &["l1"]), at(9))
            .await
            .unwrap();
        scheduler.clear();

        service.delete_reminder("r1").await.unwrap();

        assert_eq!(scheduler.calls(), vec![SchedulerCall::Cancel(1)]);
        assert!(repo.get_reminder("r1").await.unwrap().is_none());
        assert!(repo.reminders_for_letter("l1").await.unwrap().is_empty());
        assert!(repo.get_letter("l1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_twice_is_safe() {
        let (service, _repo, scheduler) = create_test_service().await;

        service
            .upsert_reminder(request("r1", at(12), &[]), at(9))
            .await
            .unwrap();
        service.delete_reminder("r1").await.unwrap();
        scheduler.clear();

        service.delete_reminder("r1").await.unwrap();

        assert!(scheduler.calls().is_empty());
        assert!(matches!(
            service.reminder_with_details("r1").await,
            Err(AppError::ReminderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let (service, repo, scheduler) = create_test_service().await;
        let mut req = request("r1", at(12), &[]);
        req.title = "   ".to_string();

        let result = service.upsert_reminder(req, at(9)).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repo.get_reminder("r1").await.unwrap().is_none());
        assert!(scheduler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_pending() {
        let (service, _repo, _scheduler) = create_test_service().await;

        service
            .upsert_reminder(request("r1", at(12) + Duration::hours(1), &[]), at(9))
            .await
            .unwrap();
        service
            .upsert_reminder(request("r2", at(12), &[]), at(9))
            .await
            .unwrap();
        service.acknowledge("r1", at(10)).await.unwrap();

        let all: Vec<String> = service
            .list_reminders()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        let pending: Vec<String> = service
            .list_pending_reminders()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();

        assert_eq!(all, vec!["r2", "r1"]);
        assert_eq!(pending, vec!["r2"]);
    }
}
