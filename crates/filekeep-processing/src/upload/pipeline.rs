//! Upload pipeline: identity → process → store.
//!
//! Processing is a best-effort enhancement. When decoding, resizing or encoding
//! fails, the failure is logged and the original bytes are stored under the same
//! name, so an upload is never lost to a processing error. Storage errors are not
//! recovered and propagate to the caller.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use filekeep_core::{ErrorLog, TracingErrorLog};
use filekeep_storage::{Disks, PutOptions, Storage, StorageResult};
use serde_json::{Map, Value};

use super::identity::generate_identity;
use super::types::{
    FileSource, GeneratedIdentity, StoredVariant, UploadOptions, UploadRequest, UploadResult,
};
use crate::error::{ProcessingError, UploadError};
use crate::image::{ImageProcessing, RasterProcessor};

/// An upload with its identity fixed. Consumed by [`UploadProcessor::upload`].
pub struct PendingUpload {
    request: UploadRequest,
    options: UploadOptions,
    identity: GeneratedIdentity,
    storage: Arc<dyn Storage>,
}

impl PendingUpload {
    pub fn identity(&self) -> &GeneratedIdentity {
        &self.identity
    }

    pub fn file_name(&self) -> &str {
        self.identity.file_name()
    }

    pub fn path(&self) -> &str {
        self.identity.path()
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }
}

pub struct UploadProcessor {
    disks: Disks,
    images: Arc<dyn ImageProcessing>,
    log: Arc<dyn ErrorLog>,
}

impl UploadProcessor {
    pub fn new(disks: Disks, images: Arc<dyn ImageProcessing>, log: Arc<dyn ErrorLog>) -> Self {
        Self { disks, images, log }
    }

    /// Processor using the `image` crate and `tracing` for failure logs.
    pub fn with_disks(disks: Disks) -> Self {
        Self::new(disks, Arc::new(RasterProcessor::new()), Arc::new(TracingErrorLog))
    }

    /// Resolve the disk and fix the upload's name and path.
    pub fn prepare(
        &self,
        request: UploadRequest,
        options: UploadOptions,
    ) -> Result<PendingUpload, UploadError> {
        let storage = self.disks.get(&options.disk).map_err(|_| {
            UploadError::Configuration(format!("Unknown disk '{}'", options.disk))
        })?;
        let identity = generate_identity(&request, &options);

        Ok(PendingUpload {
            request,
            options,
            identity,
            storage,
        })
    }

    /// Store a pending upload, resized when possible and unmodified otherwise.
    pub async fn upload(&self, pending: PendingUpload) -> Result<UploadResult, UploadError> {
        let PendingUpload {
            request,
            options,
            identity,
            storage,
        } = pending;
        let start = Instant::now();
        let put_options = PutOptions::with_visibility(options.visibility);

        let (variant, stored, size_bytes) = match self.process(&request, &options).await? {
            Ok(data) => {
                let size = data.len() as u64;
                Self::ensure_directory(storage.as_ref(), identity.directory()).await?;
                let stored = storage.put(identity.path(), data, put_options).await?;
                (StoredVariant::Processed, stored, size)
            }
            Err(cause) => {
                self.log_fallback(&identity, &options, &cause);
                Self::ensure_directory(storage.as_ref(), identity.directory()).await?;
                let stored =
                    Self::store_original(storage.as_ref(), &request, &identity, put_options)
                        .await?;
                (StoredVariant::Original, stored, request.size())
            }
        };

        tracing::info!(
            path = %identity.path(),
            disk = %options.disk,
            backend = %storage.backend_type(),
            variant = ?variant,
            stored = stored,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload stored"
        );

        Ok(UploadResult {
            url: storage.url(identity.path()),
            file_name: identity.file_name().to_string(),
            path: identity.path().to_string(),
            disk: options.disk,
            variant,
            stored,
            size_bytes,
        })
    }

    /// `prepare` followed by `upload`
    pub async fn store(
        &self,
        request: UploadRequest,
        options: UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let pending = self.prepare(request, options)?;
        self.upload(pending).await
    }

    /// Produce the resized variant. The outer error is reserved for faults that are
    /// not processing failures, such as a panic in the codec task.
    async fn process(
        &self,
        request: &UploadRequest,
        options: &UploadOptions,
    ) -> Result<Result<Bytes, ProcessingError>, UploadError> {
        let data = match request.read_bytes().await {
            Ok(data) => data,
            Err(e) => return Ok(Err(ProcessingError::Read(e))),
        };

        let images = Arc::clone(&self.images);
        let extension = request.extension().to_string();
        let height = options.height;
        let quality = options.quality;

        // Codec work is CPU-bound; run off the async pool.
        tokio::task::spawn_blocking(move || images.process(&data, &extension, height, quality))
            .await
            .map_err(|e| UploadError::Internal(format!("Image processing task failed: {}", e)))
    }

    fn log_fallback(&self, identity: &GeneratedIdentity, options: &UploadOptions, cause: &ProcessingError) {
        let mut fields = Map::new();
        fields.insert("path".to_string(), Value::String(identity.path().to_string()));
        fields.insert("disk".to_string(), Value::String(options.disk.clone()));
        fields.insert("cause".to_string(), Value::String(cause.to_string()));

        self.log.error(
            &format!("Image processing failed for {}: {}", identity.path(), cause),
            &fields,
        );
    }

    async fn ensure_directory(storage: &dyn Storage, directory: &str) -> StorageResult<()> {
        if directory.is_empty() {
            return Ok(());
        }
        if !storage.exists(directory).await? {
            storage.make_directory(directory).await?;
        }
        Ok(())
    }

    async fn store_original(
        storage: &dyn Storage,
        request: &UploadRequest,
        identity: &GeneratedIdentity,
        options: PutOptions,
    ) -> StorageResult<bool> {
        match request.source() {
            FileSource::Path(source) => {
                storage
                    .put_file_as(identity.directory(), source, identity.file_name(), options)
                    .await
            }
            FileSource::Bytes(data) => storage.put(identity.path(), data.clone(), options).await,
        }
    }
}
