//! Application state and initialization
//!
//! All services are built here over one database pool, one blob store and
//! one wake-up scheduler, and handed out through `AppState`.

use crate::config::AppConfig;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::scheduler::JobWakeUpScheduler;
use crate::services::{CategoriesService, LettersService, RehydrationService, RemindersService};
use crate::storage::FileBlobStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub scheduler: JobWakeUpScheduler,
    pub letters: LettersService,
    pub reminders: RemindersService,
    pub categories: CategoriesService,
    pub rehydration: RehydrationService,
}

/// Application setup - called once on startup
///
/// The wake-up scheduler is created but not started; the caller starts it
/// once it is ready to receive deliveries.
pub async fn setup(data_dir: &Path, config: AppConfig) -> Result<AppState> {
    tracing::info!("Initializing application in {:?}", data_dir);

    std::fs::create_dir_all(data_dir)?;

    let pool = create_pool(&config.database_path(data_dir)).await?;
    let repo = Repository::new(pool);

    let blob_store = FileBlobStore::new(config.blobs_path(data_dir));
    blob_store.initialize().await?;
    let blob_store = Arc::new(blob_store);

    let scheduler = JobWakeUpScheduler::new().await?;
    let wake_up = Arc::new(scheduler.clone());

    let state = AppState {
        data_dir: data_dir.to_path_buf(),
        letters: LettersService::new(repo.clone(), blob_store),
        reminders: RemindersService::new(repo.clone(), wake_up.clone()),
        categories: CategoriesService::new(repo.clone()),
        rehydration: RehydrationService::new(repo, wake_up),
        scheduler,
        config,
    };

    tracing::info!("Application initialized successfully");

    Ok(state)
}
