//! Database models
//!
//! Rust structs representing database entities and the read-only
//! projections built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A digitized physical letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Letter {
    pub id: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    /// Text extracted from the scanned pages
    pub transcript: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One scanned page. The image bytes live in the blob store under `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: String,
    pub letter_id: String,
    pub created_at: DateTime<Utc>,
}

/// A user-defined tag for letters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub color: String,
    /// Manual sort key, lower sorts first. Not unique.
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A scheduled reminder tagging zero or more letters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub acknowledged: bool,
    /// Wake-up scheduler slot, allocated once and never reused
    pub notification_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written by a reminder upsert
#[derive(Debug, Clone)]
pub struct ReminderFields<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub scheduled_for: DateTime<Utc>,
    pub notification_id: i64,
}

/// Desired end state of a letter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertLetterRequest {
    pub id: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub transcript: Option<String>,
    /// Document id -> file the page image should be copied from.
    /// Only read for documents that are not stored yet.
    pub documents: BTreeMap<String, PathBuf>,
    pub categories: BTreeSet<String>,
}

/// Desired end state of a reminder
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertReminderRequest {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub letters: BTreeSet<String>,
}

/// A document together with where its page image lives, if anywhere
#[derive(Debug, Clone, Serialize)]
pub struct DocumentPage {
    #[serde(flatten)]
    pub document: Document,
    pub location: Option<PathBuf>,
}

/// A letter with everything linked to it
#[derive(Debug, Clone, Serialize)]
pub struct LetterDetails {
    #[serde(flatten)]
    pub letter: Letter,
    pub documents: Vec<DocumentPage>,
    pub categories: Vec<Category>,
    pub reminders: Vec<Reminder>,
}

/// A reminder with the letters it tags
#[derive(Debug, Clone, Serialize)]
pub struct ReminderDetails {
    #[serde(flatten)]
    pub reminder: Reminder,
    pub letters: Vec<Letter>,
}
