//! Upload pipeline: name → process → store, falling back to the original bytes.

pub mod identity;
pub mod pipeline;
pub mod types;

pub use identity::{generate_identity, generate_identity_at};
pub use pipeline::{PendingUpload, UploadProcessor};
pub use types::{
    FileSource, GeneratedIdentity, StoredVariant, UploadOptions, UploadRequest, UploadResult,
};
