//! Error types for the protocol server and multiplexer

use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error produced while constructing a backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while serving the control-plane protocol
///
/// Failures of individual object operations are not errors here: they are
/// returned to the caller as diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    /// Two backends declare the same object type
    #[error("object type {type_name} is declared by both {first} and {second}")]
    ConfigurationConflict {
        type_name: String,
        first: String,
        second: String,
    },

    /// A backend could not be constructed
    #[error("backend {backend} failed to initialize: {source}")]
    BackendInit {
        backend: String,
        #[source]
        source: BoxError,
    },

    /// No backend owns the requested object type
    #[error("no backend serves object type {0}")]
    UnownedType(String),

    /// The backend was asked to configure itself a second time
    #[error("backend {0} is already configured")]
    AlreadyConfigured(String),

    /// A remote operation arrived before `configure`
    #[error("backend {0} has not been configured")]
    NotConfigured(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
