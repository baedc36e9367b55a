//! Named disk registry and construction from configuration.

#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageError, StorageResult};
use filekeep_core::config::{DEFAULT_DISK, PRIVATE_DISK};
use filekeep_core::Config;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage backends addressable by name (e.g. `public`, `local`).
#[derive(Clone, Default)]
pub struct Disks {
    disks: HashMap<String, Arc<dyn Storage>>,
}

impl Disks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disk(mut self, name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        self.insert(name, storage);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        self.disks.insert(name.into(), storage);
    }

    /// Resolve a disk by name
    pub fn get(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDisk(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.disks.contains_key(name)
    }

    /// Registered disk names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.disks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Create the `public` and `local` disks described by the configuration
#[cfg(feature = "storage-local")]
pub async fn create_disks(config: &Config) -> StorageResult<Disks> {
    let public = LocalStorage::new(
        config.public_root(),
        config.public_base_url().map(String::from),
    )
    .await?;
    let private = LocalStorage::new(config.private_root(), None).await?;

    tracing::info!(
        root = %config.storage_root().display(),
        "Storage disks initialized"
    );

    Ok(Disks::new()
        .with_disk(DEFAULT_DISK, Arc::new(public))
        .with_disk(PRIVATE_DISK, Arc::new(private)))
}

#[cfg(not(feature = "storage-local"))]
pub async fn create_disks(_config: &Config) -> StorageResult<Disks> {
    Err(StorageError::ConfigError(
        "Local storage backend not available (storage-local feature not enabled)".to_string(),
    ))
}
