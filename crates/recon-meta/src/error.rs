//! Error types for recon-meta

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed identifier {id:?}: expected format {expected}")]
    MalformedIdentifier { id: String, expected: String },

    #[error("Cannot parse version {version:?}: {reason}")]
    VersionParse { version: String, reason: String },

    #[error("Unknown access level name: {name:?}")]
    UnknownAccessLevel { name: String },

    #[error("Unknown access level value: {value}")]
    UnknownAccessValue { value: i64 },

    #[error("Access level {name:?} is not allowed for {family}; expected one of: {allowed}")]
    AccessLevelNotAllowed {
        name: String,
        family: String,
        allowed: String,
    },

    #[error("Missing required attribute: {attribute}")]
    MissingAttribute { attribute: String },

    #[error("Attribute {attribute} is not known yet")]
    UnknownValue { attribute: String },

    #[error("Attribute {attribute} must be {expected}")]
    AttributeType { attribute: String, expected: String },

    #[error("Unexpected attribute: {attribute}")]
    UnexpectedAttribute { attribute: String },

    #[error("Invalid value for {attribute}: {message}")]
    InvalidValue { attribute: String, message: String },

    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Config file too large: {path} is {size} bytes (max {max})")]
    ConfigTooLarge { path: PathBuf, size: u64, max: u64 },
}
