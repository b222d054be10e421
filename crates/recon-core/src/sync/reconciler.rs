//! The reconciliation control loop

use std::collections::HashSet;
use std::sync::Arc;

use recon_client::CallContext;

use super::report::{ApplyReport, PlannedStep, ReconcilePlan, RefreshReport};
use crate::engine::Engine;
use crate::error::{Error, ErrorKind, Operation, StateError};
use crate::ledger::Ledger;
use crate::manifest::Manifest;
use crate::plan::{ChangeAction, plan_change};
use crate::registry::ResourceRegistry;
use crate::resource::Reconcilable;
use crate::state::{ReadOutcome, TrackedState};

/// Reconciles a [`Manifest`] against the remote, tracking results in a
/// [`Ledger`].
///
/// The ledger is only mutated by successful operations. Callers save it
/// after [`plan`](Self::plan) and [`apply`](Self::apply) as they see fit.
pub struct Reconciler {
    engine: Engine,
    registry: ResourceRegistry,
}

impl Reconciler {
    pub fn new(engine: Engine, registry: ResourceRegistry) -> Self {
        Self { engine, registry }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    fn resource(&self, address: &str, type_name: &str) -> Result<&Arc<dyn Reconcilable>, StateError> {
        self.registry
            .get(type_name)
            .ok_or_else(|| StateError::UnknownType {
                address: address.to_string(),
                type_name: type_name.to_string(),
            })
    }

    /// Read every tracked entry back from the remote.
    ///
    /// Found objects have their state replaced. Objects the remote reports
    /// as not found are dropped from the ledger. Any other failure leaves the
    /// entry untouched.
    pub async fn refresh(&self, ledger: &mut Ledger, ctx: &CallContext) -> RefreshReport {
        let run = self.engine.for_run();
        self.refresh_with(&run, ledger, ctx).await
    }

    async fn refresh_with(&self, run: &Engine, ledger: &mut Ledger, ctx: &CallContext) -> RefreshReport {
        let mut report = RefreshReport::default();
        let tracked: Vec<(String, String, String)> = ledger
            .entries()
            .iter()
            .map(|e| (e.address.clone(), e.state.type_name.clone(), e.state.id.clone()))
            .collect();

        for (address, type_name, id) in tracked {
            let resource = match self.resource(&address, &type_name) {
                Ok(resource) => resource,
                Err(e) => {
                    report.errors.push(e.to_string());
                    report.failed.push(address);
                    continue;
                }
            };

            match run.read(resource.as_ref(), &id, ctx).await {
                Ok(ReadOutcome::Tracked(state)) => {
                    ledger.upsert(address.clone(), state);
                    report.refreshed.push(address);
                }
                Ok(ReadOutcome::Absent) => {
                    ledger.remove(&address);
                    report.dropped.push(address);
                }
                Err(e) => {
                    tracing::warn!(address = %address, error = %e, "Refresh failed; keeping tracked state");
                    report.errors.push(format!("{address}: {e}"));
                    report.failed.push(address);
                }
            }
        }

        tracing::info!(
            refreshed = report.refreshed.len(),
            dropped = report.dropped.len(),
            failed = report.failed.len(),
            "Refreshed tracked state"
        );
        report
    }

    /// Refresh tracked state and compute the changes needed to match
    /// `manifest`.
    ///
    /// Fails up front if the manifest names an unregistered type. Objects that
    /// cannot be refreshed or validated are reported in `errors` and left out
    /// of the plan.
    pub async fn plan(
        &self,
        manifest: &Manifest,
        ledger: &mut Ledger,
        ctx: &CallContext,
    ) -> Result<ReconcilePlan, StateError> {
        for object in &manifest.objects {
            self.resource(&object.address, &object.type_name)?;
        }

        let run = self.engine.for_run();
        let refresh = self.refresh_with(&run, ledger, ctx).await;
        let failed: HashSet<&str> = refresh.failed.iter().map(String::as_str).collect();

        let mut plan = ReconcilePlan {
            dropped: refresh.dropped.clone(),
            errors: refresh.errors.clone(),
            ..Default::default()
        };

        for object in &manifest.objects {
            if failed.contains(object.address.as_str()) {
                continue;
            }
            let resource = self.resource(&object.address, &object.type_name)?;
            let config = object.declared_config()?;
            if let Err(e) = run.validate(resource.as_ref(), &config) {
                plan.errors.push(format!("{}: {e}", object.address));
                continue;
            }

            let prior = ledger.get(&object.address).map(|e| &e.state);
            let prior = match prior {
                Some(state) if state.type_name != object.type_name => {
                    // The address changed type: destroy the old object, create the new one.
                    plan.push(delete_step(&object.address, state));
                    None
                }
                other => other,
            };

            let change = plan_change(&resource.schema(), prior, Some(&config));
            plan.push(PlannedStep {
                address: object.address.clone(),
                type_name: object.type_name.clone(),
                action: change.action,
                id: prior.map(|s| s.id.clone()),
                config: Some(config),
                changed: change.changed,
                requires_replace: change.requires_replace,
            });
        }

        for entry in ledger.entries() {
            if manifest.get(&entry.address).is_none() && !failed.contains(entry.address.as_str()) {
                plan.push(delete_step(&entry.address, &entry.state));
            }
        }

        plan.order();
        tracing::info!(
            steps = plan.steps.len(),
            unchanged = plan.unchanged.len(),
            errors = plan.errors.len(),
            "Planned reconciliation"
        );
        Ok(plan)
    }

    /// Execute `plan`, recording every success in `ledger`.
    ///
    /// A failed step is reported and the remaining steps still run, except
    /// after cancellation, which stops the run.
    pub async fn apply(&self, plan: &ReconcilePlan, ledger: &mut Ledger, ctx: &CallContext) -> ApplyReport {
        let run = self.engine.for_run();
        let mut report = ApplyReport::success();

        for step in &plan.steps {
            let resource = match self.resource(&step.address, &step.type_name) {
                Ok(resource) => resource,
                Err(e) => {
                    report.record_error(e.to_string());
                    continue;
                }
            };

            match self.apply_step(&run, resource.as_ref(), step, ledger, ctx).await {
                Ok(()) => report.record_action(step.describe()),
                Err(e) => {
                    tracing::warn!(address = %step.address, error = %e, "Step failed");
                    let cancelled = e.is_cancelled();
                    report.record_error(format!("{}: {e}", step.address));
                    if cancelled {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            success = report.success,
            actions = report.actions.len(),
            errors = report.errors.len(),
            "Applied reconciliation plan"
        );
        report
    }

    async fn apply_step(
        &self,
        run: &Engine,
        resource: &dyn Reconcilable,
        step: &PlannedStep,
        ledger: &mut Ledger,
        ctx: &CallContext,
    ) -> crate::Result<()> {
        let missing = |what: &str| {
            Error::new(
                Operation::Plan,
                step.type_name.clone(),
                step.id.clone(),
                ErrorKind::Ledger(format!("{} step for {} has no {what}", step.action, step.address)),
            )
        };

        match step.action {
            ChangeAction::NoOp => {}
            ChangeAction::Create => {
                let config = step.config.as_ref().ok_or_else(|| missing("configuration"))?;
                let state = run.create(resource, config, ctx).await?;
                ledger.upsert(step.address.clone(), state);
            }
            ChangeAction::Update => {
                let id = step.id.as_deref().ok_or_else(|| missing("identifier"))?;
                let config = step.config.as_ref().ok_or_else(|| missing("configuration"))?;
                let state = run.update(resource, id, config, ctx).await?;
                ledger.upsert(step.address.clone(), state);
            }
            ChangeAction::Replace => {
                let id = step.id.as_deref().ok_or_else(|| missing("identifier"))?;
                let config = step.config.as_ref().ok_or_else(|| missing("configuration"))?;
                run.delete(resource, id, ctx).await?;
                ledger.remove(&step.address);
                let state = run.create(resource, config, ctx).await?;
                ledger.upsert(step.address.clone(), state);
            }
            ChangeAction::Delete => {
                let id = step.id.as_deref().ok_or_else(|| missing("identifier"))?;
                run.delete(resource, id, ctx).await?;
                ledger.remove(&step.address);
            }
        }
        Ok(())
    }

    /// Adopt the existing remote object `id` under `address`.
    pub async fn import(
        &self,
        address: &str,
        type_name: &str,
        id: &str,
        ledger: &mut Ledger,
        ctx: &CallContext,
    ) -> Result<TrackedState, StateError> {
        let resource = self.resource(address, type_name)?;
        let fail = |kind: ErrorKind| Error::new(Operation::Import, type_name, Some(id.to_string()), kind);

        if let Some(existing) = ledger.get(address) {
            return Err(fail(ErrorKind::Ledger(format!(
                "{address} already tracks {} {}",
                existing.state.type_name, existing.state.id
            )))
            .into());
        }

        match self.engine.import(resource.as_ref(), id, ctx).await? {
            ReadOutcome::Tracked(state) => {
                ledger.upsert(address, state.clone());
                Ok(state)
            }
            ReadOutcome::Absent => Err(fail(ErrorKind::NotFound).into()),
        }
    }
}

fn delete_step(address: &str, state: &TrackedState) -> PlannedStep {
    PlannedStep {
        address: address.to_string(),
        type_name: state.type_name.clone(),
        action: ChangeAction::Delete,
        id: Some(state.id.clone()),
        config: None,
        changed: Vec::new(),
        requires_replace: Vec::new(),
    }
}
