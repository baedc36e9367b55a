//! Configuration module
//!
//! Settings are read from `FILEKEEP_*` environment variables (a `.env` file is
//! loaded first when present). Every setting has a default, so an empty
//! environment yields a working local configuration.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;

use crate::storage_types::Visibility;

pub const ENV_PREFIX: &str = "FILEKEEP_";
pub const DEFAULT_DISK: &str = "public";
pub const PRIVATE_DISK: &str = "local";
pub const DEFAULT_RESIZE_HEIGHT: u32 = 300;
pub const DEFAULT_QUALITY: u8 = 75;
const DEFAULT_STORAGE_ROOT: &str = "storage/app";

/// Upload settings applied when a caller does not override them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadDefaults {
    pub disk: String,
    pub visibility: Visibility,
    pub resize_height: u32,
    pub quality: u8,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            disk: DEFAULT_DISK.to_string(),
            visibility: Visibility::Public,
            resize_height: DEFAULT_RESIZE_HEIGHT,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory holding the `public` and `private` disk directories
    pub storage_root: PathBuf,
    /// Base URL the public disk is served from, if any
    pub public_base_url: Option<String>,
    pub default_disk: String,
    pub default_visibility: String,
    pub resize_height: u32,
    pub quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            public_base_url: None,
            default_disk: DEFAULT_DISK.to_string(),
            default_visibility: Visibility::Public.to_string(),
            resize_height: DEFAULT_RESIZE_HEIGHT,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from explicit `(key, value)` pairs, e.g. in tests.
    pub fn from_vars<I>(vars: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        let config = Config {
            storage_root: var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT)),
            public_base_url: var("PUBLIC_BASE_URL").filter(|s| !s.trim().is_empty()),
            default_disk: var("DEFAULT_DISK").unwrap_or_else(|| DEFAULT_DISK.to_string()),
            default_visibility: var("DEFAULT_VISIBILITY")
                .unwrap_or_else(|| Visibility::Public.to_string()),
            resize_height: var("RESIZE_HEIGHT")
                .unwrap_or_else(|| DEFAULT_RESIZE_HEIGHT.to_string())
                .parse()
                .context("FILEKEEP_RESIZE_HEIGHT must be a valid number")?,
            quality: var("QUALITY")
                .unwrap_or_else(|| DEFAULT_QUALITY.to_string())
                .parse()
                .context("FILEKEEP_QUALITY must be a number between 0 and 255")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.resize_height == 0 {
            anyhow::bail!("FILEKEEP_RESIZE_HEIGHT must be greater than 0");
        }
        if !Self::disk_names().contains(&self.default_disk.as_str()) {
            anyhow::bail!(
                "FILEKEEP_DEFAULT_DISK must be one of {:?}, got '{}'",
                Self::disk_names(),
                self.default_disk
            );
        }
        Visibility::from_str(&self.default_visibility)
            .context("FILEKEEP_DEFAULT_VISIBILITY is invalid")?;
        Ok(())
    }

    /// Names of the disks built from this configuration.
    pub fn disk_names() -> [&'static str; 2] {
        [DEFAULT_DISK, PRIVATE_DISK]
    }

    pub fn public_root(&self) -> PathBuf {
        self.storage_root.join("public")
    }

    pub fn private_root(&self) -> PathBuf {
        self.storage_root.join("private")
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url.as_deref()
    }

    pub fn upload_defaults(&self) -> UploadDefaults {
        UploadDefaults {
            disk: self.default_disk.clone(),
            visibility: Visibility::from_str(&self.default_visibility).unwrap_or_default(),
            resize_height: self.resize_height,
            quality: self.quality,
        }
    }
}
