//! Category rows

use super::Repository;
use crate::database::models::Category;
use crate::error::Result;
use chrono::{DateTime, Utc};

impl Repository {
    /// Insert or relabel a category. New categories sort after every
    /// existing one; relabeling never touches priority.
    pub async fn upsert_category_row(
        &self,
        id: &str,
        label: &str,
        color: &str,
        now: DateTime<Utc>,
    ) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, label, color, priority, created_at, updated_at)
            VALUES (?, ?, ?, (SELECT COALESCE(MAX(priority), -1) + 1 FROM categories), ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                color = excluded.color,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(label)
        .bind(color)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Upserted category: {}", id);
        Ok(category)
    }

    /// Update only the priority and modification time.
    /// Returns the number of rows touched (0 if the category is unknown).
    pub async fn set_category_priority(
        &self,
        id: &str,
        priority: i64,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let rows = sqlx::query("UPDATE categories SET priority = ?, updated_at = ? WHERE id = ?")
            .bind(priority)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows)
    }

    /// Delete a category; its letter links cascade. Returns false if absent.
    pub async fn delete_category_row(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    /// Categories in display order. Equal priorities fall back to creation order.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY priority ASC, created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
