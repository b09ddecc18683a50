//! Letters service
//!
//! Saves a letter by reconciling its documents and category tags against
//! the store in one transaction, keeping each document row and its page
//! image blob in lockstep.
//!
//! Blob writes cannot join the database transaction, so they are ordered
//! around it: a new page image is persisted before its row is inserted, and
//! a removed page image is released only after the row delete commits. Any
//! failure therefore leaves at worst an orphaned blob, never a row without
//! its image.

use crate::database::{
    DocumentPage, Letter, LetterDetails, Repository, UpsertLetterRequest,
};
use crate::error::{AppError, Result};
use crate::ids::validate_id;
use crate::services::reconcile::SetDiff;
use crate::storage::BlobStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// What a letter save actually wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LetterSyncReport {
    pub documents_added: usize,
    pub documents_removed: usize,
    pub categories_linked: usize,
    pub categories_unlinked: usize,
}

impl LetterSyncReport {
    /// True when the save touched neither blobs nor links
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Service for saving, deleting and looking up letters
#[derive(Clone)]
pub struct LettersService {
    repo: Repository,
    blob_store: Arc<dyn BlobStore>,
}

impl LettersService {
    pub fn new(repo: Repository, blob_store: Arc<dyn BlobStore>) -> Self {
        Self { repo, blob_store }
    }

    /// Make the stored letter match `req`.
    pub async fn upsert_letter(
        &self,
        req: UpsertLetterRequest,
        now: DateTime<Utc>,
    ) -> Result<LetterSyncReport> {
        validate_id(&req.id)?;
        for id in req.documents.keys().chain(req.categories.iter()) {
            validate_id(id)?;
        }

        tracing::info!(
            "Saving letter {} ({} documents, {} categories)",
            req.id,
            req.documents.len(),
            req.categories.len()
        );

        let mut persisted = Vec::new();

        match self.apply_upsert(&req, now, &mut persisted).await {
            Ok((report, released)) => {
                if !released.is_empty() {
                    self.release_blobs(&released).await;
                }
                tracing::info!("Letter saved: {} {:?}", req.id, report);
                Ok(report)
            }
            Err(e) => {
                // Rows rolled back; drop the page images nothing points at
                if !persisted.is_empty() {
                    self.release_blobs(&persisted).await;
                }
                tracing::warn!("Saving letter {} failed: {}", req.id, e);
                Err(e)
            }
        }
    }

    /// Transactional part of a save. Returns the report plus the document
    /// ids whose blobs must be released once the removal has committed.
    async fn apply_upsert(
        &self,
        req: &UpsertLetterRequest,
        now: DateTime<Utc>,
        persisted: &mut Vec<String>,
    ) -> Result<(LetterSyncReport, Vec<String>)> {
        let mut tx = self.repo.begin().await?;

        Repository::upsert_letter_row(
            &mut tx,
            &req.id,
            req.sender.as_deref(),
            req.recipient.as_deref(),
            req.transcript.as_deref(),
            now,
        )
        .await?;

        let existing_docs = Repository::document_ids_for_letter(&mut tx, &req.id).await?;
        let docs = SetDiff::between(&existing_docs, req.documents.keys());

        for id in &docs.to_remove {
            Repository::delete_document(&mut tx, id).await?;
        }

        for id in &docs.to_add {
            let Some(source) = req.documents.get(id) else {
                continue;
            };
            // Blob first: a failed persist must never leave a row behind
            self.blob_store.persist(source, id).await?;
            persisted.push(id.clone());
            Repository::insert_document(&mut tx, id, &req.id, now).await?;
        }

        let existing_cats = Repository::category_ids_for_letter(&mut tx, &req.id).await?;
        let cats = SetDiff::between(&existing_cats, &req.categories);

        for id in &cats.to_remove {
            Repository::unlink_category(&mut tx, &req.id, id).await?;
        }
        for id in &cats.to_add {
            Repository::link_category(&mut tx, &req.id, id).await?;
        }

        tx.commit().await?;

        if docs.is_empty() && cats.is_empty() {
            tracing::debug!("Letter {} pages and tags unchanged", req.id);
        }

        let report = LetterSyncReport {
            documents_added: docs.to_add.len(),
            documents_removed: docs.to_remove.len(),
            categories_linked: cats.to_add.len(),
            categories_unlinked: cats.to_remove.len(),
        };

        Ok((report, docs.to_remove))
    }

    /// Delete a letter with its documents, page images and links.
    /// Reminders that tagged it survive. Unknown ids are a no-op.
    pub async fn delete_letter(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting letter: {}", id);

        let mut tx = self.repo.begin().await?;
        let document_ids = Repository::document_ids_for_letter(&mut tx, id).await?;
        let existed = Repository::delete_letter_row(&mut tx, id).await?;
        tx.commit().await?;

        if !existed {
            tracing::debug!("Letter {} already gone", id);
            return Ok(());
        }

        self.release_blobs(&document_ids).await;

        tracing::info!("Letter deleted: {} ({} documents)", id, document_ids.len());
        Ok(())
    }

    /// Release blobs after their rows are gone. An orphaned blob only wastes
    /// space, so failures are logged and left for `sweep_orphan_blobs`.
    async fn release_blobs(&self, ids: &[String]) {
        if let Err(e) = self.blob_store.delete_many(ids).await {
            tracing::warn!("Failed to release {} blob(s): {}", ids.len(), e);
        }
    }

    /// Letter with its pages, categories and reminders
    pub async fn letter_with_details(&self, id: &str) -> Result<LetterDetails> {
        let letter = self
            .repo
            .get_letter(id)
            .await?
            .ok_or_else(|| AppError::LetterNotFound(id.to_string()))?;

        let mut documents = Vec::new();
        for document in self.repo.list_documents(id).await? {
            let location = self.blob_store.get(&document.id).await?;
            documents.push(DocumentPage { document, location });
        }

        Ok(LetterDetails {
            letter,
            documents,
            categories: self.repo.categories_for_letter(id).await?,
            reminders: self.repo.reminders_for_letter(id).await?,
        })
    }

    /// List all letters, most recently edited first
    pub async fn list_letters(&self) -> Result<Vec<Letter>> {
        self.repo.list_letters().await
    }

    /// Search letters by sender, recipient and transcript.
    ///
    /// Every word of `query` must appear. A blank query matches every
    /// letter; a query with no searchable words matches none. A non-empty
    /// `category_filter` keeps letters tagged with at least one of those
    /// categories.
    pub async fn search(&self, query: &str, category_filter: &[String]) -> Result<Vec<Letter>> {
        let trimmed = query.trim();

        let expression = if trimmed.is_empty() {
            None
        } else {
            match build_match_query(trimmed) {
                Some(expression) => Some(expression),
                None => {
                    tracing::debug!("Search query {:?} has no searchable words", trimmed);
                    return Ok(Vec::new());
                }
            }
        };

        match self
            .repo
            .search_letters(expression.as_deref(), category_filter)
            .await
        {
            Ok(letters) => Ok(letters),
            Err(sqlx::Error::Database(e)) => {
                tracing::warn!("Search query {:?} rejected: {}", trimmed, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete blobs that no document row refers to and return how many.
    ///
    /// Must not run while letters are being saved: a page image persisted
    /// for an uncommitted row would look orphaned.
    pub async fn sweep_orphan_blobs(&self) -> Result<usize> {
        let known: HashSet<String> = self.repo.all_document_ids().await?.into_iter().collect();

        let orphans: Vec<String> = self
            .blob_store
            .list_all()
            .await?
            .into_iter()
            .filter(|id| !known.contains(id))
            .collect();

        if !orphans.is_empty() {
            self.blob_store.delete_many(&orphans).await?;
            tracing::info!("Swept {} orphaned blob(s)", orphans.len());
        }

        Ok(orphans.len())
    }
}

/// Turn free text into an FTS5 expression requiring every word.
///
/// Each whitespace-separated word is quoted as a phrase so punctuation is
/// tokenized like indexed text instead of parsed as query syntax:
/// `Jean-Luc` becomes the phrase "jean luc".
fn build_match_query(query: &str) -> Option<String> {
    let terms = query
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}
