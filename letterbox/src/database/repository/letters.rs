//! Letter, document and category-link rows

use super::Repository;
use crate::database::models::{Category, Document, Letter, Reminder};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

impl Repository {
    /// Insert or update a letter row. `created_at` is only written on insert.
    pub async fn upsert_letter_row(
        conn: &mut SqliteConnection,
        id: &str,
        sender: Option<&str>,
        recipient: Option<&str>,
        transcript: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Letter> {
        let letter = sqlx::query_as::<_, Letter>(
            r#"
            INSERT INTO letters (id, sender, recipient, transcript, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                sender = excluded.sender,
                recipient = excluded.recipient,
                transcript = excluded.transcript,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(sender)
        .bind(recipient)
        .bind(transcript)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM letters_fts WHERE letter_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO letters_fts (letter_id, sender, recipient, transcript) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(sender)
        .bind(recipient)
        .bind(transcript)
        .execute(&mut *conn)
        .await?;

        Ok(letter)
    }

    /// Delete a letter row. Documents and links go with it via cascade.
    /// Returns false if there was no such letter.
    pub async fn delete_letter_row(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        sqlx::query("DELETE FROM letters_fts WHERE letter_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let rows = sqlx::query("DELETE FROM letters WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    pub async fn document_ids_for_letter(
        conn: &mut SqliteConnection,
        letter_id: &str,
    ) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT id FROM documents WHERE letter_id = ? ORDER BY id")
            .bind(letter_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(ids)
    }

    pub async fn insert_document(
        conn: &mut SqliteConnection,
        id: &str,
        letter_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO documents (id, letter_id, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(letter_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        tracing::debug!("Inserted document {} for letter {}", id, letter_id);
        Ok(())
    }

    pub async fn delete_document(conn: &mut SqliteConnection, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!("Deleted document row {}", id);
        Ok(())
    }

    pub async fn category_ids_for_letter(
        conn: &mut SqliteConnection,
        letter_id: &str,
    ) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT category_id FROM letter_categories WHERE letter_id = ? ORDER BY category_id",
        )
        .bind(letter_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(ids)
    }

    pub async fn link_category(
        conn: &mut SqliteConnection,
        letter_id: &str,
        category_id: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO letter_categories (letter_id, category_id) VALUES (?, ?)")
            .bind(letter_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn unlink_category(
        conn: &mut SqliteConnection,
        letter_id: &str,
        category_id: &str,
    ) -> Result<()> {
        sqlx::query("DELETE FROM letter_categories WHERE letter_id = ? AND category_id = ?")
            .bind(letter_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn get_letter(&self, id: &str) -> Result<Option<Letter>> {
        let letter = sqlx::query_as::<_, Letter>("SELECT * FROM letters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(letter)
    }

    /// List all letters, most recently edited first
    pub async fn list_letters(&self) -> Result<Vec<Letter>> {
        let letters = sqlx::query_as::<_, Letter>(
            "SELECT * FROM letters ORDER BY updated_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(letters)
    }

    pub async fn list_documents(&self, letter_id: &str) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE letter_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(letter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Every document id in the store, for orphan blob sweeps
    pub async fn all_document_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT id FROM documents")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    pub async fn categories_for_letter(&self, letter_id: &str) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.* FROM categories c
            JOIN letter_categories lc ON lc.category_id = c.id
            WHERE lc.letter_id = ?
            ORDER BY c.priority ASC, c.created_at ASC, c.rowid ASC
            "#,
        )
        .bind(letter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn reminders_for_letter(&self, letter_id: &str) -> Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT r.* FROM reminders r
            JOIN letter_reminders lr ON lr.reminder_id = r.id
            WHERE lr.letter_id = ?
            ORDER BY r.scheduled_for ASC, r.notification_id ASC
            "#,
        )
        .bind(letter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    /// Full-text search over sender, recipient and transcript.
    ///
    /// `match_expression` is bound to FTS5 `MATCH` unchanged; `None` lists
    /// every letter. An expression SQLite rejects comes back as the raw
    /// error and the caller decides how to degrade.
    pub async fn search_letters(
        &self,
        match_expression: Option<&str>,
        category_filter: &[String],
    ) -> std::result::Result<Vec<Letter>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT l.* FROM letters l");

        match match_expression {
            Some(expression) => {
                builder.push(" JOIN letters_fts f ON f.letter_id = l.id WHERE f.letters_fts MATCH ");
                builder.push_bind(expression.to_string());
            }
            None => {
                builder.push(" WHERE 1 = 1");
            }
        }

        if !category_filter.is_empty() {
            builder.push(
                " AND EXISTS (SELECT 1 FROM letter_categories lc \
                 WHERE lc.letter_id = l.id AND lc.category_id IN (",
            );
            let mut ids = builder.separated(", ");
            for id in category_filter {
                ids.push_bind(id.clone());
            }
            ids.push_unseparated("))");
        }

        builder.push(" ORDER BY l.updated_at DESC, l.id ASC");

        builder
            .build_query_as::<Letter>()
            .fetch_all(&self.pool)
            .await
    }
}
