//! Reconciliation engine
//!
//! The engine owns the per-object state machine:
//!
//! ```text
//! Unknown --create--> Tracked --read(found)--> Tracked
//!                     Tracked --update------> Tracked (re-read)
//!                     Tracked --read(404)---> Absent  (caller drops state)
//!                     Tracked --delete------> Unknown (404 counts as success)
//! Unknown --import(id)--> Tracked
//! ```
//!
//! Every operation checks the cancellation token before its first remote
//! call. Nothing is retried. Errors carry the operation, the type name and
//! the identifier when known.

use std::sync::Arc;

use recon_client::{CallContext, Outcome, RemoteClient};
use recon_meta::config::DEFAULT_PAGE_SIZE;
use recon_meta::{CapabilityDescriptor, DeclaredConfig, ProviderConfig};

use crate::error::{Error, ErrorKind, Operation, Result};
use crate::gate::MemoizedProbe;
use crate::resource::{Reconcilable, Remote, RemoteState};
use crate::state::{ReadOutcome, TrackedState};

/// Drives [`Reconcilable`] object types against one remote client.
#[derive(Clone)]
pub struct Engine {
    client: Arc<dyn RemoteClient>,
    page_size: u32,
    minimum: Option<CapabilityDescriptor>,
    probe: Option<Arc<MemoizedProbe>>,
}

impl Engine {
    /// Create an engine with the default page size and no version floor.
    ///
    /// The engine probes the remote version live on every gated call until
    /// [`Engine::for_run`] is used.
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            minimum: None,
            probe: None,
        }
    }

    /// Engine configured from provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`recon_meta::Error::VersionParse`] if the configured
    /// `minimum_version` is not a valid capability descriptor.
    pub fn from_config(client: Arc<dyn RemoteClient>, config: &ProviderConfig) -> recon_meta::Result<Self> {
        Ok(Self {
            client,
            page_size: config.page_size,
            minimum: config.minimum_descriptor()?,
            probe: None,
        })
    }

    /// Items requested per page in list scans. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Refuse every operation against remotes older than `minimum`.
    pub fn with_minimum_version(mut self, minimum: CapabilityDescriptor) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// A copy of this engine that probes the remote version at most once.
    ///
    /// Use one per reconciliation run.
    pub fn for_run(&self) -> Self {
        Self {
            probe: Some(Arc::new(MemoizedProbe::new())),
            ..self.clone()
        }
    }

    /// The remote client every operation goes through.
    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// Items requested per page in list scans.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn remote<'a>(&'a self, ctx: &'a CallContext) -> Remote<'a> {
        let remote = Remote::new(self.client.as_ref(), ctx, self.page_size);
        match &self.probe {
            Some(probe) => remote.with_probe(probe),
            None => remote,
        }
    }

    async fn preflight(&self, remote: &Remote<'_>) -> std::result::Result<(), ErrorKind> {
        remote.ctx().ensure_active()?;
        if let Some(minimum) = self.minimum {
            remote.require_version("provider", minimum).await?;
        }
        Ok(())
    }

    fn track(
        &self,
        resource: &dyn Reconcilable,
        state: RemoteState,
    ) -> std::result::Result<TrackedState, ErrorKind> {
        let id = resource.id_format().encode(&state.id)?;
        Ok(TrackedState::new(resource.type_name(), id, state.attributes))
    }

    /// Validate a declared configuration. No remote calls.
    pub fn validate(&self, resource: &dyn Reconcilable, config: &DeclaredConfig) -> Result<()> {
        resource
            .validate(config)
            .map_err(|e| Error::new(Operation::Validate, resource.type_name(), None, ErrorKind::InvalidConfig(e)))
    }

    /// Create the remote object and return its tracked state.
    ///
    /// The configuration is validated, including the identifier components
    /// it supplies, before the first remote call. On any failure no state is
    /// returned, so nothing partial is tracked.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidConfig` before any remote call, with `Cancelled`
    /// or `CapabilityUnavailable` from the preflight, or with the error the
    /// object type reports.
    pub async fn create(
        &self,
        resource: &dyn Reconcilable,
        config: &DeclaredConfig,
        ctx: &CallContext,
    ) -> Result<TrackedState> {
        let type_name = resource.type_name();
        let fail = |kind: ErrorKind| Error::new(Operation::Create, type_name, None, kind);
        tracing::debug!(type_name, operation = "create", "Engine operation");

        resource
            .validate(config)
            .map_err(|e| fail(ErrorKind::InvalidConfig(e)))?;
        let remote = self.remote(ctx);
        self.preflight(&remote).await.map_err(fail)?;

        let created = resource.create(&remote, config).await.map_err(fail)?;
        let state = self.track(resource, created).map_err(fail)?;
        tracing::info!(type_name, id = %state.id, "Created remote object");
        Ok(state)
    }

    /// Read a tracked object back from the remote.
    ///
    /// A 404, or an object type reporting the object gone, yields
    /// [`ReadOutcome::Absent`] rather than an error.
    ///
    /// # Errors
    ///
    /// Fails with `MalformedIdentifier` if `id` does not decode, and with
    /// any non-404 remote failure.
    pub async fn read(&self, resource: &dyn Reconcilable, id: &str, ctx: &CallContext) -> Result<ReadOutcome> {
        self.read_as(Operation::Read, resource, id, ctx).await
    }

    /// Adopt an existing remote object by its composite identifier.
    ///
    /// Same semantics as [`Engine::read`] after decoding the identifier.
    pub async fn import(
        &self,
        resource: &dyn Reconcilable,
        id: &str,
        ctx: &CallContext,
    ) -> Result<ReadOutcome> {
        let outcome = self.read_as(Operation::Import, resource, id, ctx).await?;
        if let ReadOutcome::Tracked(state) = &outcome {
            tracing::info!(type_name = resource.type_name(), id = %state.id, "Imported remote object");
        }
        Ok(outcome)
    }

    async fn read_as(
        &self,
        operation: Operation,
        resource: &dyn Reconcilable,
        id: &str,
        ctx: &CallContext,
    ) -> Result<ReadOutcome> {
        let type_name = resource.type_name();
        let fail = |kind: ErrorKind| Error::new(operation, type_name, Some(id.to_string()), kind);
        tracing::debug!(type_name, id, operation = %operation, "Engine operation");

        let parts = resource.id_format().decode(id).map_err(|e| fail(e.into()))?;
        let remote = self.remote(ctx);
        self.preflight(&remote).await.map_err(fail)?;

        match resource.read(&remote, &parts).await {
            Ok(Some(found)) => Ok(ReadOutcome::Tracked(self.track(resource, found).map_err(fail)?)),
            Ok(None) | Err(ErrorKind::NotFound) => {
                tracing::warn!(type_name, id, "Remote object is gone; dropping from tracked state");
                Ok(ReadOutcome::Absent)
            }
            Err(kind) => Err(fail(kind)),
        }
    }

    /// Apply a changed configuration in place, then re-read.
    ///
    /// Types without in-place updates fail with `ImmutableResource` before
    /// any remote call.
    pub async fn update(
        &self,
        resource: &dyn Reconcilable,
        id: &str,
        config: &DeclaredConfig,
        ctx: &CallContext,
    ) -> Result<TrackedState> {
        let type_name = resource.type_name();
        let fail = |kind: ErrorKind| Error::new(Operation::Update, type_name, Some(id.to_string()), kind);
        tracing::debug!(type_name, id, operation = "update", "Engine operation");

        let parts = resource.id_format().decode(id).map_err(|e| fail(e.into()))?;
        if !resource.supports_update() {
            return Err(fail(ErrorKind::ImmutableResource {
                reason: format!("{type_name} has no attributes that can change in place"),
            }));
        }
        resource
            .validate(config)
            .map_err(|e| fail(ErrorKind::InvalidConfig(e)))?;

        let remote = self.remote(ctx);
        self.preflight(&remote).await.map_err(fail)?;
        resource.update(&remote, &parts, config).await.map_err(fail)?;

        // Server-computed fields may have changed; track what the remote reports.
        let current = resource
            .read(&remote, &parts)
            .await
            .map_err(fail)?
            .ok_or_else(|| fail(ErrorKind::NotFound))?;
        let state = self.track(resource, current).map_err(fail)?;
        tracing::info!(type_name, id = %state.id, "Updated remote object");
        Ok(state)
    }

    /// Delete the remote object. Already-absent objects count as deleted.
    ///
    /// # Errors
    ///
    /// Fails with `MalformedIdentifier` if `id` does not decode, and with
    /// any non-404 remote failure.
    pub async fn delete(&self, resource: &dyn Reconcilable, id: &str, ctx: &CallContext) -> Result<()> {
        let type_name = resource.type_name();
        let fail = |kind: ErrorKind| Error::new(Operation::Delete, type_name, Some(id.to_string()), kind);
        tracing::debug!(type_name, id, operation = "delete", "Engine operation");

        let parts = resource.id_format().decode(id).map_err(|e| fail(e.into()))?;
        let remote = self.remote(ctx);
        self.preflight(&remote).await.map_err(fail)?;

        match resource.delete(&remote, &parts).await {
            Ok(Outcome::Found(())) => {
                tracing::info!(type_name, id, "Deleted remote object");
                Ok(())
            }
            Ok(Outcome::NotFound) | Err(ErrorKind::NotFound) => {
                tracing::warn!(type_name, id, "Remote object already absent; delete is a no-op");
                Ok(())
            }
            Err(kind) => Err(fail(kind)),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("page_size", &self.page_size)
            .field("minimum", &self.minimum)
            .field("memoized", &self.probe.is_some())
            .finish()
    }
}
