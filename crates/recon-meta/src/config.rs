//! Provider configuration
//!
//! The same configuration is read from a TOML file by local runs and sent as
//! JSON in the protocol `configure` call:
//!
//! ```toml
//! version = "1"
//! page_size = 50
//! minimum_version = "15.0"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::version::CapabilityDescriptor;
use crate::{Error, Result};

/// Largest configuration file accepted, in bytes.
pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Upper bound the remote system accepts for `per_page`.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Settings for the reconciliation engine and its backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Configuration schema version
    #[serde(default = "default_version")]
    pub version: String,
    /// Items requested per page during list scans
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Refuse to operate against remote systems older than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            page_size: DEFAULT_PAGE_SIZE,
            minimum_version: None,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|_| Error::ConfigNotFound {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(Error::ConfigTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                max: MAX_CONFIG_SIZE,
            });
        }

        let content = fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: ProviderConfig = toml::from_str(&content).map_err(|e| Error::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.check().map_err(|message| Error::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::debug!(path = %path.display(), page_size = config.page_size, "Loaded provider config");
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        if let Some(minimum) = &self.minimum_version {
            CapabilityDescriptor::parse(minimum).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Parsed `minimum_version`, if set.
    pub fn minimum_descriptor(&self) -> Result<Option<CapabilityDescriptor>> {
        self.minimum_version
            .as_deref()
            .map(CapabilityDescriptor::parse)
            .transpose()
    }
}
