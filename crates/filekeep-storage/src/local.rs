use crate::keys;
use crate::traits::{PutOptions, Storage, StorageError, StorageResult};
use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Local filesystem storage implementation
///
/// Files are written to a temporary sibling and renamed into place, so a reader
/// never observes a partially written file under the final key.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "storage/app/public")
    /// * `base_url` - Base URL for serving files, if the disk is public (e.g., "http://localhost:8000/storage")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: Option<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing path traversal sequences, and keys that resolve
    /// outside the base storage directory through symlinks.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        keys::validate_key(key)?;

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::DirectoryFailed(format!("{}: {}", parent.display(), e))
            })?;
        }
        Ok(())
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }

    async fn apply_visibility(path: &Path, visibility: Visibility) -> StorageResult<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(visibility.file_mode());
            fs::set_permissions(path, permissions).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to set permissions on {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        #[cfg(not(unix))]
        let _ = (path, visibility);
        Ok(())
    }

    /// Move a fully written temporary file into place.
    async fn commit(tmp: &Path, path: &Path, visibility: Visibility) -> StorageResult<()> {
        Self::apply_visibility(tmp, visibility).await?;
        fs::rename(tmp, path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to move file into {}: {}", path.display(), e))
        })
    }

    async fn write_bytes(path: &Path, tmp: &Path, data: &[u8], visibility: Visibility) -> StorageResult<()> {
        let mut file = fs::File::create(tmp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Self::commit(tmp, path, visibility).await
    }

    async fn copy_file(source: &Path, path: &Path, tmp: &Path, visibility: Visibility) -> StorageResult<u64> {
        let mut reader = fs::File::open(source).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to open source {}: {}", source.display(), e))
        })?;

        let mut file = fs::File::create(tmp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Self::commit(tmp, path, visibility).await?;
        Ok(bytes_copied)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn make_directory(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        fs::create_dir_all(&path).await.map_err(|e| {
            StorageError::DirectoryFailed(format!("{}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), key = %key, "Local storage directory ready");
        Ok(())
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        let tmp = Self::temp_path(&path);
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        if let Err(e) = Self::write_bytes(&path, &tmp, &data, options.visibility).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            visibility = %options.visibility,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(true)
    }

    async fn put_file_as(
        &self,
        directory: &str,
        source: &Path,
        name: &str,
        options: PutOptions,
    ) -> StorageResult<bool> {
        let key = keys::join(directory, name);
        let path = self.key_to_path(&key)?;
        let tmp = Self::temp_path(&path);

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let bytes_copied = match Self::copy_file(source, &path, &tmp, options.visibility).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        tracing::info!(
            source = %source.display(),
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            visibility = %options.visibility,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put_file_as successful"
        );

        Ok(true)
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn visibility(&self, key: &str) -> StorageResult<Visibility> {
        let path = self.key_to_path(key)?;
        let meta = fs::metadata(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::BackendError(e.to_string()),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if meta.permissions().mode() & 0o004 != 0 {
                Ok(Visibility::Public)
            } else {
                Ok(Visibility::Private)
            }
        }
        #[cfg(not(unix))]
        {
            let _ = meta;
            Ok(Visibility::Public)
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await? {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");

        Ok(())
    }

    fn url(&self, key: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
