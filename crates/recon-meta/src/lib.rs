//! Data model for the remote reconciler.
//!
//! This crate holds the leaf types every other crate builds on:
//!
//! - [`identifier`]: composite identifiers correlating tracked state with remote objects
//! - [`version`]: capability descriptors parsed from remote version strings
//! - [`access`]: the closed access-level enumeration and its numeric codes
//! - [`value`]: declared configuration values (unknown, null, known)
//! - [`schema`]: per-type attribute declarations
//! - [`config`]: provider configuration

pub mod access;
pub mod config;
pub mod error;
pub mod identifier;
pub mod schema;
pub mod value;
pub mod version;

pub use access::{AccessFamily, AccessLevel, name_to_value, value_to_name};
pub use config::ProviderConfig;
pub use error::{Error, Result};
pub use identifier::{DELIMITER, IdFormat};
pub use schema::{AttrKind, AttributeSchema, ResourceSchema, attributes_equivalent};
pub use value::{AttrValue, DeclaredConfig};
pub use version::CapabilityDescriptor;
