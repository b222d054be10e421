//! Remote client boundary for the remote reconciler.
//!
//! The remote system is an external collaborator. This crate only defines
//! how the engine talks to it:
//!
//! - [`RemoteClient`]: create, get, update, delete, list and version calls
//! - [`Outcome`]: the tagged `Found | NotFound` result for lookups and deletes
//! - [`RemoteError`]: transport failures, with 404 classification
//! - [`CallContext`]: the caller-supplied cancellation token

pub mod client;
pub mod context;
pub mod error;
pub mod outcome;

pub use client::RemoteClient;
pub use context::CallContext;
pub use error::{RemoteError, Result};
pub use outcome::{Outcome, Page, classify};
pub use tokio_util::sync::CancellationToken;
