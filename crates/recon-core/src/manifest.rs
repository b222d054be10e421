//! Declaration manifest
//!
//! Operators declare objects in a TOML file:
//!
//! ```toml
//! [[object]]
//! address = "pages_domain.docs"
//! type = "pages_domain"
//!
//! [object.config]
//! project = "group/site"
//! domain = "docs.example.com"
//! auto_ssl_enabled = true
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use recon_meta::DeclaredConfig;
use recon_meta::config::MAX_CONFIG_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Every object the operator wants to exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "object")]
    pub objects: Vec<DeclaredObject>,
}

/// One declared object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredObject {
    pub address: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub config: toml::Table,
}

impl DeclaredObject {
    pub fn new(address: impl Into<String>, type_name: impl Into<String>, config: toml::Table) -> Self {
        Self {
            address: address.into(),
            type_name: type_name.into(),
            config,
        }
    }

    /// The declared configuration. Manifest values are always known.
    pub fn declared_config(&self) -> Result<DeclaredConfig, StateError> {
        let json = serde_json::to_value(&self.config)?;
        Ok(DeclaredConfig::from_json(json))
    }
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self, StateError> {
        let manifest: Manifest = toml::from_str(content)?;

        let mut seen = HashSet::new();
        for object in &manifest.objects {
            if !seen.insert(object.address.as_str()) {
                return Err(StateError::DuplicateAddress {
                    source_name: "manifest",
                    address: object.address.clone(),
                });
            }
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, StateError> {
        let metadata = fs::metadata(path).map_err(|_| StateError::NotFound {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(StateError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                max: MAX_CONFIG_SIZE,
            });
        }
        let manifest = Self::parse(&fs::read_to_string(path)?)?;
        tracing::debug!(path = %path.display(), objects = manifest.objects.len(), "Loaded manifest");
        Ok(manifest)
    }

    pub fn get(&self, address: &str) -> Option<&DeclaredObject> {
        self.objects.iter().find(|o| o.address == address)
    }
}
