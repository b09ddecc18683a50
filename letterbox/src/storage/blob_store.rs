//! Page image blob storage
//!
//! One blob per document id. Files are fanned out by the first two
//! characters of the id to keep directories small.
//!
//! Example: id "9f3c1e..." is stored at "pages/9f/9f3c1e..."

use crate::error::{AppError, Result};
use crate::ids::validate_id;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Blob storage addressed by document id
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy the file at `source` into the store under `id` and return where
    /// it now lives.
    ///
    /// Fails with `SourceUnavailable` if `source` is missing and with
    /// `AlreadyExists` if `id` already has a blob.
    async fn persist(&self, source: &Path, id: &str) -> Result<PathBuf>;

    /// Location of the blob for `id`, if one exists
    async fn get(&self, id: &str) -> Result<Option<PathBuf>>;

    /// Remove the blob for `id`. Missing blobs are not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove several blobs
    async fn delete_many(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }

    /// Ids of every stored blob
    async fn list_all(&self) -> Result<Vec<String>>;
}

/// Filesystem-backed blob store
#[derive(Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        let prefix: String = id.chars().take(2).collect();
        Ok(self.root.join(prefix).join(id))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn persist(&self, source: &Path, id: &str) -> Result<PathBuf> {
        let path = self.path_for(id)?;

        let data = match fs::read(source).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::SourceUnavailable(source.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if path.exists() {
            return Err(AppError::AlreadyExists(id.to_string()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first so a crash never leaves a torn blob
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &path).await?;

        tracing::debug!("Persisted blob: {} ({} bytes)", id, data.len());

        Ok(path)
    }

    async fn get(&self, id: &str) -> Result<Option<PathBuf>> {
        let path = self.path_for(id)?;
        Ok(path.exists().then_some(path))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;

        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path).await?;

        tracing::debug!("Deleted blob: {}", id);

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        if !self.root.exists() {
            return Ok(ids);
        }

        let mut shards = fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }

            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let is_blob = path.is_file() && path.extension().is_none();

                if let Some(id) = path.file_name().and_then(|n| n.to_str()) {
                    if is_blob && validate_id(id).is_ok() {
                        ids.push(id.to_string());
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
