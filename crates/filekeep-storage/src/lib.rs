//! Filekeep Storage Library
//!
//! This crate provides the storage abstraction used by the upload pipeline,
//! a local filesystem backend, an in-memory backend, and the registry that
//! resolves backends ("disks") by name.
//!
//! # Storage key format
//!
//! Keys are relative, `/`-separated paths such as `avatars/20240101120000_ab3K9xYz_1f2e3d4c.jpg`.
//! The empty key names the disk root. Keys must not contain `..` or a leading `/`;
//! key handling is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_disks, Disks};
pub use filekeep_core::{StorageBackend, Visibility};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use traits::{PutOptions, Storage, StorageError, StorageResult};
