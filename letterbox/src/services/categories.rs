//! Categories service
//!
//! Category labels and colors are edited through `upsert_category`; manual
//! ordering goes through `set_priority`, which touches nothing else so a
//! drag-to-reorder built from a stale read cannot clobber a label.

use crate::config::MAX_CATEGORY_LABEL_LENGTH;
use crate::database::{Category, Repository};
use crate::error::{AppError, Result};
use crate::ids::validate_id;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct CategoriesService {
    repo: Repository,
}

impl CategoriesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create or relabel a category. New categories sort last.
    pub async fn upsert_category(
        &self,
        id: &str,
        label: &str,
        color: &str,
        now: DateTime<Utc>,
    ) -> Result<Category> {
        validate_id(id)?;

        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::Validation("Category label cannot be empty".to_string()));
        }
        if label.chars().count() > MAX_CATEGORY_LABEL_LENGTH {
            return Err(AppError::Validation(format!(
                "Category label longer than {} characters",
                MAX_CATEGORY_LABEL_LENGTH
            )));
        }

        let category = self.repo.upsert_category_row(id, label, color, now).await?;

        tracing::info!("Category saved: {} ({})", category.id, category.label);
        Ok(category)
    }

    /// Move a category in the manual ordering
    pub async fn set_priority(&self, id: &str, priority: i64, now: DateTime<Utc>) -> Result<()> {
        if self.repo.set_category_priority(id, priority, now).await? == 0 {
            return Err(AppError::CategoryNotFound(id.to_string()));
        }

        tracing::debug!("Category {} priority set to {}", id, priority);
        Ok(())
    }

    /// Delete a category. Letters it tagged keep their other tags.
    pub async fn delete_category(&self, id: &str) -> Result<()> {
        if self.repo.delete_category_row(id).await? {
            tracing::info!("Category deleted: {}", id);
        }
        Ok(())
    }

    pub async fn get_category(&self, id: &str) -> Result<Category> {
        self.repo
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(id.to_string()))
    }

    /// Categories in display order
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.repo.list_categories().await
    }
}
