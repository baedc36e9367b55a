//! In-memory storage backend, for tests and ephemeral disks.

use crate::keys;
use crate::traits::{PutOptions, Storage, StorageError, StorageResult};
use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    files: HashMap<String, (Bytes, Visibility)>,
    directories: HashSet<String>,
}

/// Storage implementation that keeps files in memory
///
/// With `require_directories`, a write into a directory that was never created
/// fails, like an object store with explicit prefixes would.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
    require_directories: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose parent directory has not been created.
    pub fn strict() -> Self {
        Self {
            state: Mutex::default(),
            require_directories: true,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.state().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of all stored files, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().files.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn store(&self, key: &str, data: Bytes, visibility: Visibility) -> StorageResult<()> {
        keys::validate_key(key)?;
        let mut state = self.state();
        let directory = keys::parent(key);
        if self.require_directories
            && !directory.is_empty()
            && !state.directories.contains(directory)
        {
            return Err(StorageError::NotFound(format!(
                "directory '{}' does not exist",
                directory
            )));
        }
        state.files.insert(key.to_string(), (data, visibility));
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        keys::validate_key(key)?;
        let key = key.trim_end_matches('/');
        let state = self.state();
        Ok(key.is_empty() || state.files.contains_key(key) || state.directories.contains(key))
    }

    async fn make_directory(&self, key: &str) -> StorageResult<()> {
        keys::validate_key(key)?;
        let mut state = self.state();
        let mut current = key.trim_end_matches('/');
        while !current.is_empty() {
            state.directories.insert(current.to_string());
            current = keys::parent(current);
        }
        Ok(())
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> StorageResult<bool> {
        let size = data.len();
        self.store(key, data, options.visibility)?;
        tracing::debug!(key = %key, size_bytes = size, "Memory storage put successful");
        Ok(true)
    }

    async fn put_file_as(
        &self,
        directory: &str,
        source: &Path,
        name: &str,
        options: PutOptions,
    ) -> StorageResult<bool> {
        let data = tokio::fs::read(source).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read source {}: {}", source.display(), e))
        })?;
        let key = keys::join(directory, name);
        self.store(&key, Bytes::from(data), options.visibility)?;
        Ok(true)
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.state()
            .files
            .get(key)
            .map(|(data, _)| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn visibility(&self, key: &str) -> StorageResult<Visibility> {
        self.state()
            .files
            .get(key)
            .map(|(_, visibility)| *visibility)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.state().files.remove(key);
        Ok(())
    }

    fn url(&self, _key: &str) -> Option<String> {
        None
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
