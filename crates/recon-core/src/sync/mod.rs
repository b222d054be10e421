//! Control loop over a manifest and a ledger
//!
//! - **refresh**: read every tracked object back, dropping the ones that are gone
//! - **plan**: diff declarations against refreshed state
//! - **apply**: execute a plan, recording each success in the ledger
//! - **import**: adopt an existing remote object

mod reconciler;
mod report;

pub use reconciler::Reconciler;
pub use report::{ApplyReport, PlannedStep, ReconcilePlan, RefreshReport};
