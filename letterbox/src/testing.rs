//! Recording doubles for the blob store and wake-up scheduler

use crate::error::{AppError, Result};
use crate::scheduler::{ReminderPayload, WakeUpScheduler};
use crate::storage::{BlobStore, FileBlobStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// File blob store that counts successful writes and deletes
pub struct RecordingBlobStore {
    inner: FileBlobStore,
    persists: AtomicUsize,
    deletes: AtomicUsize,
}

impl RecordingBlobStore {
    pub async fn new(temp: &TempDir) -> Self {
        let inner = FileBlobStore::new(temp.path().join("pages"));
        inner.initialize().await.unwrap();
        Self {
            inner,
            persists: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn persists(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn persist(&self, source: &Path, id: &str) -> Result<PathBuf> {
        let location = self.inner.persist(source, id).await?;
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(location)
    }

    async fn get(&self, id: &str) -> Result<Option<PathBuf>> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        self.inner.list_all().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    Schedule {
        notification_id: i64,
        fire_at: DateTime<Utc>,
        reminder_id: String,
    },
    Cancel(i64),
    Send(String),
}

/// Scheduler that only remembers what it was asked to do
#[derive(Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<SchedulerCall>>,
    refuse_cancels: AtomicBool,
}

impl RecordingScheduler {
    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SchedulerCall::Cancel(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// (slot, fire time, reminder id) for every schedule call, in order
    pub fn scheduled(&self) -> Vec<(i64, DateTime<Utc>, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SchedulerCall::Schedule {
                    notification_id,
                    fire_at,
                    reminder_id,
                } => Some((notification_id, fire_at, reminder_id)),
                _ => None,
            })
            .collect()
    }

    /// Make `cancel` fail without recording anything
    pub fn refuse_cancels(&self, refuse: bool) {
        self.refuse_cancels.store(refuse, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl WakeUpScheduler for RecordingScheduler {
    async fn schedule(
        &self,
        notification_id: i64,
        fire_at: DateTime<Utc>,
        payload: ReminderPayload,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(SchedulerCall::Schedule {
            notification_id,
            fire_at,
            reminder_id: payload.reminder_id,
        });
        Ok(())
    }

    async fn cancel(&self, notification_id: i64) -> Result<()> {
        if self.refuse_cancels.load(Ordering::SeqCst) {
            return Err(AppError::Scheduler("alarm service unavailable".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(SchedulerCall::Cancel(notification_id));
        Ok(())
    }

    async fn send(&self, payload: ReminderPayload) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(SchedulerCall::Send(payload.reminder_id));
        Ok(())
    }
}
