//! Ledger entry

use serde::{Deserialize, Serialize};

use crate::state::TrackedState;

/// One tracked object, keyed by the address it was declared under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Operator-chosen address, e.g. `pages_domain.docs`
    pub address: String,
    pub state: TrackedState,
}

impl LedgerEntry {
    pub fn new(address: impl Into<String>, state: TrackedState) -> Self {
        Self {
            address: address.into(),
            state,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.state.type_name
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }
}
