use filekeep_core::AppError;
use filekeep_storage::StorageError;
use thiserror::Error;

/// Failure to derive a processed variant. The pipeline recovers from these by
/// storing the original bytes.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("failed to read source: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Errors surfaced by the upload pipeline
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::ImageProcessing(err.to_string())
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Configuration(msg) => AppError::Configuration(msg),
            UploadError::Storage(StorageError::UnknownDisk(name)) => {
                AppError::Configuration(format!("Unknown disk: {}", name))
            }
            UploadError::Storage(e) => AppError::Storage(e.to_string()),
            UploadError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filekeep_core::ErrorMetadata;

    #[test]
    fn storage_failures_map_to_sensitive_500() {
        let err: AppError =
            UploadError::Storage(StorageError::UploadFailed("disk full".to_string())).into();
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "Failed to store file");
    }

    #[test]
    fn unknown_disk_is_a_configuration_error() {
        let err: AppError =
            UploadError::Storage(StorageError::UnknownDisk("s3".to_string())).into();
        assert!(matches!(err, AppError::Configuration(ref m) if m.contains("s3")));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn processing_errors_map_to_image_processing() {
        let err: AppError = ProcessingError::UnsupportedFormat("txt".to_string()).into();
        assert_eq!(err.error_code(), "IMAGE_PROCESSING_ERROR");
    }
}
