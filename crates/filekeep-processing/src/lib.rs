//! Filekeep Processing Library
//!
//! The upload pipeline: unique name generation, best-effort image resizing,
//! and the storage write with a fallback to the original bytes.

pub mod error;
pub mod image;
pub mod upload;

pub use error::{ProcessingError, UploadError};
pub use crate::image::{ImageProcessing, RasterProcessor, ResizeConstraints};
pub use upload::{
    generate_identity, FileSource, GeneratedIdentity, PendingUpload, StoredVariant, UploadOptions,
    UploadProcessor, UploadRequest, UploadResult,
};
