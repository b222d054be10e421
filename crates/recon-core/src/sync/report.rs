//! Plans and reports produced by the control loop

use recon_meta::DeclaredConfig;
use serde::{Deserialize, Serialize};

use crate::plan::ChangeAction;

/// One step of a reconciliation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub address: String,
    pub type_name: String,
    pub action: ChangeAction,
    /// Identifier of the tracked object; absent for creates
    pub id: Option<String>,
    /// Declared configuration; absent for deletes
    pub config: Option<DeclaredConfig>,
    #[serde(default)]
    pub changed: Vec<String>,
    #[serde(default)]
    pub requires_replace: Vec<String>,
}

impl PlannedStep {
    fn rank(&self) -> u8 {
        match self.action {
            ChangeAction::Delete => 0,
            ChangeAction::Replace => 1,
            ChangeAction::Update => 2,
            ChangeAction::Create => 3,
            ChangeAction::NoOp => 4,
        }
    }

    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => format!("{} {} ({} {id})", self.action, self.address, self.type_name),
            None => format!("{} {} ({})", self.action, self.address, self.type_name),
        }
    }
}

/// Ordered set of changes: deletes, then replaces, updates and creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    pub steps: Vec<PlannedStep>,
    /// Addresses already matching their declaration
    pub unchanged: Vec<String>,
    /// Addresses dropped because the remote object was gone
    pub dropped: Vec<String>,
    /// Addresses that could not be planned, with the reason
    pub errors: Vec<String>,
}

impl ReconcilePlan {
    pub fn has_changes(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of steps with `action`.
    pub fn count(&self, action: ChangeAction) -> usize {
        self.steps.iter().filter(|s| s.action == action).count()
    }

    pub(crate) fn push(&mut self, step: PlannedStep) {
        if step.action == ChangeAction::NoOp {
            self.unchanged.push(step.address);
        } else {
            self.steps.push(step);
        }
    }

    pub(crate) fn order(&mut self) {
        self.steps.sort_by_key(PlannedStep::rank);
    }
}

/// Result of refreshing every tracked entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub dropped: Vec<String>,
    /// Addresses whose read failed; their tracked state is unchanged
    pub failed: Vec<String>,
    pub errors: Vec<String>,
}

/// Report of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Whether every step succeeded
    pub success: bool,
    /// Actions taken
    pub actions: Vec<String>,
    /// Per-object failures
    pub errors: Vec<String>,
}

impl ApplyReport {
    pub fn success() -> Self {
        Self {
            success: true,
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_action(&mut self, action: String) {
        self.actions.push(action);
    }

    pub fn record_error(&mut self, error: String) {
        self.success = false;
        self.errors.push(error);
    }
}
