//! Reminder rows, reminder-letter links and the notification slot counter

use super::Repository;
use crate::database::models::{Letter, Reminder, ReminderFields};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

impl Repository {
    /// Advance the notification slot counter and return the new value.
    ///
    /// The counter is seeded from the highest slot ever stored, so a slot
    /// freed by deleting the newest reminder is not handed out again.
    pub async fn next_notification_id(conn: &mut SqliteConnection) -> Result<i64> {
        let next: i64 = sqlx::query_scalar(
            r#"
            UPDATE notification_sequence
            SET value = MAX(value, (SELECT COALESCE(MAX(notification_id), 0) FROM reminders)) + 1
            WHERE id = 1
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(next)
    }

    /// Insert or update a reminder row.
    ///
    /// On conflict the stored `notification_id`, `acknowledged` flag and
    /// `created_at` are kept.
    pub async fn upsert_reminder_row(
        conn: &mut SqliteConnection,
        fields: &ReminderFields<'_>,
        now: DateTime<Utc>,
    ) -> Result<Reminder> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminders
                (id, title, description, scheduled_for, acknowledged, notification_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                scheduled_for = excluded.scheduled_for,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(fields.id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.scheduled_for)
        .bind(fields.notification_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(
            "Upserted reminder {} (slot {})",
            reminder.id,
            reminder.notification_id
        );
        Ok(reminder)
    }

    /// Delete a reminder row; its letter links cascade. Returns false if absent.
    pub async fn delete_reminder_row(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    pub async fn letter_ids_for_reminder(
        conn: &mut SqliteConnection,
        reminder_id: &str,
    ) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT letter_id FROM letter_reminders WHERE reminder_id = ? ORDER BY letter_id",
        )
        .bind(reminder_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(ids)
    }

    pub async fn link_letter(
        conn: &mut SqliteConnection,
        reminder_id: &str,
        letter_id: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO letter_reminders (letter_id, reminder_id) VALUES (?, ?)")
            .bind(letter_id)
            .bind(reminder_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn unlink_letter(
        conn: &mut SqliteConnection,
        reminder_id: &str,
        letter_id: &str,
    ) -> Result<()> {
        sqlx::query("DELETE FROM letter_reminders WHERE letter_id = ? AND reminder_id = ?")
            .bind(letter_id)
            .bind(reminder_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Set the acknowledged flag if it is not already set.
    /// Returns 1 on the first acknowledgement, 0 otherwise.
    pub async fn acknowledge_reminder(&self, id: &str, now: DateTime<Utc>) -> Result<u64> {
        let rows = sqlx::query(
            "UPDATE reminders SET acknowledged = 1, updated_at = ? WHERE id = ? AND acknowledged = 0",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    pub async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>> {
        let reminder = sqlx::query_as::<_, Reminder>("SELECT * FROM reminders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reminder)
    }

    /// All reminders, soonest first
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(
            "SELECT * FROM reminders ORDER BY scheduled_for ASC, notification_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    /// Unacknowledged reminders, soonest first
    pub async fn list_pending_reminders(&self) -> Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT * FROM reminders
            WHERE acknowledged = 0
            ORDER BY scheduled_for ASC, notification_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    pub async fn letters_for_reminder(&self, reminder_id: &str) -> Result<Vec<Letter>> {
        let letters = sqlx::query_as::<_, Letter>(
            r#"
            SELECT l.* FROM letters l
            JOIN letter_reminders lr ON lr.letter_id = l.id
            WHERE lr.reminder_id = ?
            ORDER BY l.updated_at DESC, l.id ASC
            "#,
        )
        .bind(reminder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(letters)
    }
}
