//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Directory creation failed: {0}")]
    DirectoryFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Unknown disk: {0}")]
    UnknownDisk(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Options applied to a single write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub visibility: Visibility,
}

impl PutOptions {
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self { visibility }
    }
}

/// Storage abstraction trait
///
/// All storage backends (local filesystem, memory) must implement this trait.
/// Writes report `true` when the backend accepted the data; failures are errors.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Create a directory and any missing parents. Creating an existing directory is not an error.
    async fn make_directory(&self, key: &str) -> StorageResult<()>;

    /// Write `data` to `key`, replacing any existing file
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> StorageResult<bool>;

    /// Copy the local file at `source` into `directory` under `name`
    async fn put_file_as(
        &self,
        directory: &str,
        source: &Path,
        name: &str,
        options: PutOptions,
    ) -> StorageResult<bool>;

    /// Read a whole file
    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Visibility a file was stored with
    async fn visibility(&self, key: &str) -> StorageResult<Visibility>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL for `key`, when the backend is served over HTTP
    fn url(&self, key: &str) -> Option<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
