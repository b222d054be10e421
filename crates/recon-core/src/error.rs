//! Error types for recon-core
//!
//! Object operations fail with [`Error`]: the operation, the object type, the
//! identifier when known, and an [`ErrorKind`] from the fixed taxonomy.
//! Failures loading or saving local state (ledger, manifest) are
//! [`StateError`].

use std::fmt;
use std::path::PathBuf;

use recon_client::RemoteError;
use serde::{Deserialize, Serialize};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Validate,
    Create,
    Read,
    Update,
    Delete,
    Import,
    Plan,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Validate => "validate",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::Plan => "plan",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy for object operations.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Network, authentication or server failure other than an explicit 404
    #[error("{0}")]
    Transport(#[source] RemoteError),

    /// The remote explicitly reported the object as absent
    #[error("remote object not found")]
    NotFound,

    #[error("{0}")]
    MalformedIdentifier(#[source] recon_meta::Error),

    #[error("{0}")]
    VersionParse(#[source] recon_meta::Error),

    /// The declared change can only be made by destroying and recreating
    #[error("cannot be updated in place: {reason}")]
    ImmutableResource { reason: String },

    #[error("{capability} requires remote version {required} or later, connected to {current}")]
    CapabilityUnavailable {
        capability: String,
        required: String,
        current: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[source] recon_meta::Error),

    /// The remote answered, but not with what the object type expects
    #[error("unexpected remote response: {0}")]
    InvalidResponse(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}

impl ErrorKind {
    /// Stable tag used in protocol diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Transport(_) => "transport",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedIdentifier(_) => "malformed_identifier",
            ErrorKind::VersionParse(_) => "version_parse",
            ErrorKind::ImmutableResource { .. } => "immutable_resource",
            ErrorKind::CapabilityUnavailable { .. } => "capability_unavailable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidConfig(_) => "invalid_config",
            ErrorKind::InvalidResponse(_) => "invalid_response",
            ErrorKind::Ledger(_) => "ledger",
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        ErrorKind::InvalidResponse(message.into())
    }
}

impl From<RemoteError> for ErrorKind {
    fn from(err: RemoteError) -> Self {
        if err.is_not_found() {
            ErrorKind::NotFound
        } else if err.is_cancelled() {
            ErrorKind::Cancelled
        } else {
            ErrorKind::Transport(err)
        }
    }
}

impl From<recon_meta::Error> for ErrorKind {
    fn from(err: recon_meta::Error) -> Self {
        match err {
            recon_meta::Error::MalformedIdentifier { .. } => ErrorKind::MalformedIdentifier(err),
            recon_meta::Error::VersionParse { .. } => ErrorKind::VersionParse(err),
            _ => ErrorKind::InvalidConfig(err),
        }
    }
}

/// An object operation failure with its context.
#[derive(Debug, thiserror::Error)]
#[error("{operation} {type_name}{}: {kind}", render_id(.id))]
pub struct Error {
    pub operation: Operation,
    pub type_name: String,
    pub id: Option<String>,
    #[source]
    pub kind: ErrorKind,
}

fn render_id(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" {id:?}"),
        None => String::new(),
    }
}

impl Error {
    pub fn new(
        operation: Operation,
        type_name: impl Into<String>,
        id: Option<String>,
        kind: impl Into<ErrorKind>,
    ) -> Self {
        Self {
            operation,
            type_name: type_name.into(),
            id,
            kind: kind.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }
}

/// A resource type registered twice in one registry.
#[derive(Debug, thiserror::Error)]
#[error("resource type {type_name} is already registered")]
pub struct DuplicateType {
    pub type_name: String,
}

/// Errors loading, saving or interpreting local state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Ledger error: {message}")]
    Ledger { message: String },

    #[error("Duplicate address in {source_name}: {address}")]
    DuplicateAddress {
        source_name: &'static str,
        address: String,
    },

    #[error("Unknown resource type {type_name} for {address}")]
    UnknownType { address: String, type_name: String },

    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("File too large: {path} is {size} bytes (max {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error(transparent)]
    Operation(#[from] Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
