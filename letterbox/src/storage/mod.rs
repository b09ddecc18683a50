//! Storage module
//!
//! Blob storage for scanned page images.

pub mod blob_store;

pub use blob_store::{BlobStore, FileBlobStore};
