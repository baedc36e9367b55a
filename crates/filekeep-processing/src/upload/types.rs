//! Types for the upload pipeline.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use filekeep_core::{UploadDefaults, Visibility};
use filekeep_storage::keys;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::error::UploadError;

const HASH_NAME_LENGTH: usize = 40;

/// Where the uploaded bytes live.
#[derive(Clone, Debug)]
pub enum FileSource {
    Bytes(Bytes),
    /// A file on local disk, e.g. a multipart temp file. It is only read, never moved.
    Path(PathBuf),
}

/// An accepted upload.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    source: FileSource,
    original_filename: String,
    extension: String,
    size: u64,
    hash_name: String,
}

impl UploadRequest {
    /// Accept an in-memory upload
    pub fn from_bytes(
        original_filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Result<Self, UploadError> {
        let original_filename = original_filename.into();
        if original_filename.trim().is_empty() {
            return Err(UploadError::Configuration("No file attached".to_string()));
        }
        let data = data.into();
        let size = data.len() as u64;
        Ok(Self::build(FileSource::Bytes(data), original_filename, size))
    }

    /// Accept a file on local disk. Fails when it is missing, not a regular file, or unreadable.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let unreadable =
            |e: std::io::Error| UploadError::Configuration(format!("Cannot read file {}: {}", path.display(), e));

        let meta = tokio::fs::metadata(path).await.map_err(unreadable)?;
        if !meta.is_file() {
            return Err(UploadError::Configuration(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        tokio::fs::File::open(path).await.map_err(unreadable)?;

        let original_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::build(
            FileSource::Path(path.to_path_buf()),
            original_filename,
            meta.len(),
        ))
    }

    fn build(source: FileSource, original_filename: String, size: u64) -> Self {
        let extension = Path::new(&original_filename)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let hash_name = random_hash_name(&extension);
        Self {
            source,
            original_filename,
            extension,
            size,
            hash_name,
        }
    }

    /// Use a declared extension instead of the one in the filename. Case is kept.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self.hash_name = random_hash_name(&self.extension);
        self
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Random per-request name the identity hash fragment is derived from
    pub fn hash_name(&self) -> &str {
        &self.hash_name
    }

    pub(crate) async fn read_bytes(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Bytes(data) => Ok(data.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

fn random_hash_name(extension: &str) -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(HASH_NAME_LENGTH)
        .map(char::from)
        .collect();
    if extension.is_empty() {
        random
    } else {
        format!("{}.{}", random, extension)
    }
}

/// Per-upload settings. Built by value, then handed to `UploadProcessor::prepare`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    /// Directory on the disk, relative to its root
    pub path: String,
    pub disk: String,
    pub visibility: Visibility,
    /// Target height of the processed variant
    pub height: u32,
    /// Encode quality; range handling is left to the codec
    pub quality: u8,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from_defaults(&UploadDefaults::default())
    }
}

impl UploadOptions {
    pub fn from_defaults(defaults: &UploadDefaults) -> Self {
        Self {
            path: String::new(),
            disk: defaults.disk.clone(),
            visibility: defaults.visibility,
            height: defaults.resize_height,
            quality: defaults.quality,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = disk.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }
}

/// Generated name and final storage path of one upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedIdentity {
    file_name: String,
    path: String,
}

impl GeneratedIdentity {
    pub(crate) fn new(base_path: &str, file_name: String) -> Self {
        let path = keys::join(base_path, &file_name);
        Self { file_name, path }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directory holding the file; empty at the disk root
    pub fn directory(&self) -> &str {
        keys::parent(&self.path)
    }
}

/// Which bytes ended up in storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredVariant {
    Processed,
    Original,
}

#[derive(Clone, Debug, Serialize)]
pub struct UploadResult {
    pub file_name: String,
    pub path: String,
    pub disk: String,
    pub variant: StoredVariant,
    /// Write outcome reported by the backend
    pub stored: bool,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl UploadResult {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
