//! Shared key handling for storage backends.

use crate::{StorageError, StorageResult};

/// Reject keys that could escape the disk root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.split('/').any(|segment| segment == "..") || key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Join a directory and a name with a single `/`. An empty directory yields `name`.
///
/// The directory is taken relative to the disk root, so leading `/` are dropped.
pub fn join(directory: &str, name: &str) -> String {
    let directory = directory.trim_matches('/');
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", directory, name)
    }
}

/// Directory part of a key; empty for keys at the disk root.
pub fn parent(key: &str) -> &str {
    match key.rfind('/') {
        Some(index) => &key[..index],
        None => "",
    }
}
