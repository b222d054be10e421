//! Reconciliation engine
//!
//! Object types implement [`Reconcilable`]. The [`Engine`] runs them through
//! the create/read/update/delete/import state machine against a
//! [`recon_client::RemoteClient`]. On top of that:
//!
//! - [`plan`] decides what a declaration change requires
//! - [`ResourceRegistry`] maps type names to object types
//! - [`gate`] probes the remote version for capability checks
//! - [`Ledger`] persists tracked state between runs
//! - [`Manifest`] holds the operator's declarations
//! - [`Reconciler`] ties them together into a refresh/plan/apply loop

pub mod engine;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod manifest;
pub mod plan;
pub mod registry;
pub mod resource;
pub mod state;
pub mod sync;

pub use engine::Engine;
pub use error::{DuplicateType, Error, ErrorKind, Operation, Result, StateError};
pub use gate::{MemoizedProbe, VersionProbe};
pub use ledger::{Ledger, LedgerEntry};
pub use manifest::{DeclaredObject, Manifest};
pub use plan::{ChangeAction, PlannedChange, plan_change};
pub use registry::ResourceRegistry;
pub use resource::{Reconcilable, Remote, RemoteState, ResourceResult};
pub use state::{ReadOutcome, TrackedState};
pub use sync::{ApplyReport, PlannedStep, ReconcilePlan, Reconciler, RefreshReport};
