//! Filekeep Core Library
//!
//! This crate provides the error taxonomy, configuration, storage types and the
//! error reporting sink shared by all filekeep components.

pub mod config;
pub mod error;
pub mod hooks;
pub mod report;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, UploadDefaults, DEFAULT_DISK, DEFAULT_QUALITY, DEFAULT_RESIZE_HEIGHT};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{ActorContext, AnonymousActor, ErrorLog, StaticActor, TracingErrorLog};
pub use report::{ErrorReporter, FailureBody, ReportedFailure};
pub use storage_types::{StorageBackend, Visibility};
