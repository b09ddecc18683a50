//! Repository layer for database operations
//!
//! Read-only projections run directly on the pool. Row mutations are
//! associated functions taking a `&mut SqliteConnection`, so the services
//! decide which of them share one transaction.

mod categories;
mod letters;
mod reminders;

use crate::error::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
