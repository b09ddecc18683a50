//! Error types for Letterbox
//!
//! All errors use thiserror for structured error handling.
//! Errors serialize to their display string so a caller-facing layer can
//! forward them verbatim.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The page image a document should be persisted from is gone.
    #[error("Blob source unavailable: {0}")]
    SourceUnavailable(PathBuf),

    /// A blob was persisted twice for the same id without a delete in between.
    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    #[error("Letter not found: {0}")]
    LetterNotFound(String),

    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
