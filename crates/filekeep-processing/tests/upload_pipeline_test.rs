use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use filekeep_core::{ErrorLog, StorageBackend, Visibility};
use filekeep_processing::{
    ImageProcessing, ProcessingError, RasterProcessor, ResizeConstraints, StoredVariant,
    UploadError, UploadOptions, UploadProcessor, UploadRequest,
};
use filekeep_storage::{
    Disks, LocalStorage, MemoryStorage, PutOptions, Storage, StorageError, StorageResult,
};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use serde_json::{Map, Value};

#[derive(Default)]
struct RecordingLog {
    entries: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingLog {
    fn entries(&self) -> Vec<(String, Map<String, Value>)> {
        self.entries.lock().unwrap().clone()
    }
}

impl ErrorLog for RecordingLog {
    fn error(&self, message: &str, fields: &Map<String, Value>) {
        self.entries
            .lock()
            .unwrap()
            .push((message.to_string(), fields.clone()));
    }
}

/// Fails every decode, whatever the input.
struct BrokenCodec;

impl ImageProcessing for BrokenCodec {
    fn decode(&self, _data: &[u8]) -> Result<DynamicImage, ProcessingError> {
        Err(ProcessingError::Decode("codec unavailable".to_string()))
    }

    fn resize(
        &self,
        image: DynamicImage,
        _width: u32,
        _height: u32,
        _constraints: ResizeConstraints,
    ) -> Result<DynamicImage, ProcessingError> {
        Ok(image)
    }

    fn encode_by_extension(
        &self,
        _image: &DynamicImage,
        extension: &str,
        _quality: u8,
    ) -> Result<Bytes, ProcessingError> {
        Err(ProcessingError::UnsupportedFormat(extension.to_string()))
    }
}

struct PanickingCodec;

impl ImageProcessing for PanickingCodec {
    fn decode(&self, _data: &[u8]) -> Result<DynamicImage, ProcessingError> {
        panic!("decoder bug");
    }

    fn resize(
        &self,
        image: DynamicImage,
        _width: u32,
        _height: u32,
        _constraints: ResizeConstraints,
    ) -> Result<DynamicImage, ProcessingError> {
        Ok(image)
    }

    fn encode_by_extension(
        &self,
        _image: &DynamicImage,
        _extension: &str,
        _quality: u8,
    ) -> Result<Bytes, ProcessingError> {
        Ok(Bytes::new())
    }
}

/// Accepts directory operations but rejects every write.
struct ReadOnlyStorage;

#[async_trait]
impl Storage for ReadOnlyStorage {
    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(true)
    }

    async fn make_directory(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn put(&self, key: &str, _data: Bytes, _options: PutOptions) -> StorageResult<bool> {
        Err(StorageError::UploadFailed(format!("{}: read-only file system", key)))
    }

    async fn put_file_as(
        &self,
        directory: &str,
        _source: &Path,
        name: &str,
        _options: PutOptions,
    ) -> StorageResult<bool> {
        Err(StorageError::UploadFailed(format!(
            "{}/{}: read-only file system",
            directory, name
        )))
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn visibility(&self, key: &str) -> StorageResult<Visibility> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    fn url(&self, _key: &str) -> Option<String> {
        None
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn memory_processor(
    images: Arc<dyn ImageProcessing>,
) -> (UploadProcessor, Arc<MemoryStorage>, Arc<RecordingLog>) {
    let storage = Arc::new(MemoryStorage::strict());
    let log = Arc::new(RecordingLog::default());
    let disks = Disks::new().with_disk("public", storage.clone());
    (UploadProcessor::new(disks, images, log.clone()), storage, log)
}

#[tokio::test]
async fn corrupt_jpeg_is_stored_unmodified() {
    let (processor, storage, log) = memory_processor(Arc::new(RasterProcessor::new()));
    let original = b"\xff\xd8\xff\xe0 truncated jpeg".to_vec();
    let request = UploadRequest::from_bytes("holiday.jpg", original.clone()).unwrap();

    let result = processor
        .store(request, UploadOptions::default().with_path("photos"))
        .await
        .unwrap();

    assert_eq!(result.variant, StoredVariant::Original);
    assert!(result.stored);
    assert!(result.path().starts_with("photos/"));
    assert!(result.file_name().ends_with(".jpg"));
    assert_eq!(storage.read(result.path()).await.unwrap(), original);

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    let (message, fields) = &entries[0];
    assert!(message.contains(result.path()));
    assert!(message.contains("failed to decode image"));
    assert_eq!(fields["path"], Value::String(result.path().to_string()));
    assert!(fields["cause"].as_str().unwrap().contains("decode"));
}

#[tokio::test]
async fn forced_processing_failure_still_stores_file() {
    let (processor, storage, log) = memory_processor(Arc::new(BrokenCodec));
    let original = png_bytes(40, 20);
    let request = UploadRequest::from_bytes("logo.png", original.clone()).unwrap();

    let result = processor
        .store(request, UploadOptions::default().with_path("brand"))
        .await
        .unwrap();

    let stored = storage.read(result.path()).await.unwrap();
    assert!(!stored.is_empty());
    assert_eq!(stored, original);
    assert_eq!(result.size_bytes, original.len() as u64);
    assert!(log.entries()[0].0.contains("codec unavailable"));
}

#[tokio::test]
async fn image_is_resized_to_configured_height() {
    let (processor, storage, log) = memory_processor(Arc::new(RasterProcessor::new()));
    let request = UploadRequest::from_bytes("wide.png", png_bytes(1200, 600)).unwrap();

    let result = processor
        .store(request, UploadOptions::default().with_path("banners"))
        .await
        .unwrap();

    assert_eq!(result.variant, StoredVariant::Processed);
    let stored = storage.read(result.path()).await.unwrap();
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!(decoded.dimensions(), (600, 300));
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn webp_encoder_rejection_falls_back_to_original() {
    let (processor, storage, log) = memory_processor(Arc::new(RasterProcessor::new()));
    // Too wide for libwebp and short enough that no resize happens.
    let original = png_bytes(20_000, 200);
    let request = UploadRequest::from_bytes("banner.webp", original.clone()).unwrap();

    let result = processor
        .store(request, UploadOptions::default().with_path("banners"))
        .await
        .unwrap();

    assert_eq!(result.variant, StoredVariant::Original);
    assert_eq!(storage.read(result.path()).await.unwrap(), original);
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].0.contains("failed to encode image"));
}

#[tokio::test]
async fn leading_slash_in_base_path_is_stored_relative_to_disk_root() {
    let (processor, storage, _log) = memory_processor(Arc::new(RasterProcessor::new()));
    let request = UploadRequest::from_bytes("a.jpg", b"corrupt".to_vec()).unwrap();

    let result = processor
        .store(request, UploadOptions::default().with_path("/avatars"))
        .await
        .unwrap();

    assert_eq!(result.path(), format!("avatars/{}", result.file_name()));
    assert!(storage.exists("avatars").await.unwrap());
    assert_eq!(storage.read(result.path()).await.unwrap(), b"corrupt");
}

#[tokio::test]
async fn small_image_is_not_upscaled() {
    let (processor, storage, _log) = memory_processor(Arc::new(RasterProcessor::new()));
    let request = UploadRequest::from_bytes("icon.png", png_bytes(64, 32)).unwrap();

    let result = processor
        .store(request, UploadOptions::default().with_height(300))
        .await
        .unwrap();

    let decoded = image::load_from_memory(&storage.read(result.path()).await.unwrap()).unwrap();
    assert_eq!(decoded.dimensions(), (64, 32));
}

#[tokio::test]
async fn missing_directory_is_created_and_reused() {
    let (processor, storage, _log) = memory_processor(Arc::new(RasterProcessor::new()));
    let options = UploadOptions::default().with_path("gallery/2024");

    assert!(!storage.exists("gallery/2024").await.unwrap());

    let first = processor
        .store(
            UploadRequest::from_bytes("a.png", png_bytes(10, 10)).unwrap(),
            options.clone(),
        )
        .await
        .unwrap();
    let second = processor
        .store(
            UploadRequest::from_bytes("b.png", png_bytes(10, 10)).unwrap(),
            options,
        )
        .await
        .unwrap();

    assert!(storage.exists("gallery/2024").await.unwrap());
    assert_ne!(first.path(), second.path());
    assert_eq!(storage.len(), 2);
}

#[tokio::test]
async fn prepared_identity_is_the_stored_path() {
    let (processor, storage, _log) = memory_processor(Arc::new(RasterProcessor::new()));
    let request = UploadRequest::from_bytes("doc.png", png_bytes(8, 8)).unwrap();

    let pending = processor
        .prepare(request, UploadOptions::default().with_path("docs"))
        .unwrap();
    let file_name = pending.file_name().to_string();
    let path = pending.path().to_string();

    let result = processor.upload(pending).await.unwrap();

    assert_eq!(result.file_name(), file_name);
    assert_eq!(result.path(), path);
    assert_eq!(path, format!("docs/{}", file_name));
    assert!(storage.exists(&path).await.unwrap());
}

#[tokio::test]
async fn unknown_disk_fails_before_any_write() {
    let (processor, storage, _log) = memory_processor(Arc::new(RasterProcessor::new()));
    let request = UploadRequest::from_bytes("a.png", png_bytes(4, 4)).unwrap();

    let result = processor.prepare(request, UploadOptions::default().with_disk("s3"));

    assert!(matches!(result, Err(UploadError::Configuration(msg)) if msg.contains("s3")));
    assert!(storage.is_empty());
}

#[tokio::test]
async fn storage_failures_propagate() {
    let log = Arc::new(RecordingLog::default());
    let disks = Disks::new().with_disk("public", Arc::new(ReadOnlyStorage));
    let processor = UploadProcessor::new(disks, Arc::new(RasterProcessor::new()), log.clone());

    let processed = processor
        .store(
            UploadRequest::from_bytes("ok.png", png_bytes(10, 10)).unwrap(),
            UploadOptions::default(),
        )
        .await;
    assert!(matches!(
        processed,
        Err(UploadError::Storage(StorageError::UploadFailed(_)))
    ));

    let fallback = processor
        .store(
            UploadRequest::from_bytes("bad.jpg", b"garbage".to_vec()).unwrap(),
            UploadOptions::default(),
        )
        .await;
    assert!(matches!(
        fallback,
        Err(UploadError::Storage(StorageError::UploadFailed(_)))
    ));
    assert_eq!(log.entries().len(), 1);
}

#[tokio::test]
async fn codec_panic_is_not_treated_as_processing_failure() {
    let (processor, storage, log) = memory_processor(Arc::new(PanickingCodec));
    let request = UploadRequest::from_bytes("a.png", png_bytes(4, 4)).unwrap();

    let result = processor.store(request, UploadOptions::default()).await;

    assert!(matches!(result, Err(UploadError::Internal(_))));
    assert!(storage.is_empty());
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn local_disk_fallback_copies_source_file() {
    let disk_dir = tempfile::tempdir().unwrap();
    let upload_dir = tempfile::tempdir().unwrap();
    let source = upload_dir.path().join("scan.jpg");
    std::fs::write(&source, b"not an image at all").unwrap();

    let storage = Arc::new(LocalStorage::new(disk_dir.path(), None).await.unwrap());
    let log = Arc::new(RecordingLog::default());
    let processor = UploadProcessor::new(
        Disks::new().with_disk("local", storage.clone()),
        Arc::new(RasterProcessor::new()),
        log.clone(),
    );

    let request = UploadRequest::from_path(&source).await.unwrap();
    let result = processor
        .store(
            request,
            UploadOptions::default()
                .with_disk("local")
                .with_path("users/7")
                .with_visibility(Visibility::Private),
        )
        .await
        .unwrap();

    assert_eq!(result.variant, StoredVariant::Original);
    assert_eq!(result.disk, "local");
    assert!(disk_dir.path().join("users/7").is_dir());
    assert_eq!(
        storage.read(result.path()).await.unwrap(),
        b"not an image at all"
    );
    assert!(source.exists());
    #[cfg(unix)]
    assert_eq!(
        storage.visibility(result.path()).await.unwrap(),
        Visibility::Private
    );
    assert_eq!(log.entries().len(), 1);
}

#[tokio::test]
async fn local_disk_processed_upload_has_public_url() {
    let disk_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(
        LocalStorage::new(disk_dir.path(), Some("https://files.example.com".to_string()))
            .await
            .unwrap(),
    );
    let processor = UploadProcessor::with_disks(Disks::new().with_disk("public", storage));

    let result = processor
        .store(
            UploadRequest::from_bytes("tall.png", png_bytes(300, 900)).unwrap(),
            UploadOptions::default().with_path("posters").with_height(300),
        )
        .await
        .unwrap();

    assert_eq!(result.variant, StoredVariant::Processed);
    assert_eq!(
        result.url.as_deref(),
        Some(format!("https://files.example.com/{}", result.path()).as_str())
    );
    let decoded = image::open(disk_dir.path().join(result.path())).unwrap();
    assert_eq!(decoded.dimensions(), (100, 300));
}
