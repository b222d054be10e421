//! The `Reconcilable` capability and the remote call handle given to it
//!
//! An object type implements [`Reconcilable`] once. The [`Engine`] drives it
//! through the create/read/update/delete state machine; the type only maps
//! declared configuration to remote payloads and back.
//!
//! [`Engine`]: crate::Engine

use async_trait::async_trait;
use recon_client::{CallContext, Outcome, RemoteClient};
use recon_meta::{CapabilityDescriptor, DeclaredConfig, IdFormat, ResourceSchema};
use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::gate::{self, MemoizedProbe, VersionProbe};

/// Result type for object-type implementations. The engine adds context.
pub type ResourceResult<T> = std::result::Result<T, ErrorKind>;

/// What an object type reports back after creating or reading an object.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteState {
    /// Identifier components, in [`IdFormat`] order
    pub id: Vec<String>,
    pub attributes: Map<String, Value>,
}

impl RemoteState {
    pub fn new(id: Vec<String>, attributes: Map<String, Value>) -> Self {
        Self { id, attributes }
    }
}

/// An object type the engine can reconcile.
#[async_trait]
pub trait Reconcilable: Send + Sync {
    /// Unique type name, e.g. `pages_domain`
    fn type_name(&self) -> &'static str;

    fn id_format(&self) -> IdFormat;

    fn schema(&self) -> ResourceSchema;

    /// Validate a declared configuration without touching the remote.
    ///
    /// Covers the schema, the identifier components taken from the
    /// declaration, and [`Reconcilable::validate_extra`].
    fn validate(&self, config: &DeclaredConfig) -> recon_meta::Result<()> {
        self.schema().validate(config)?;
        self.id_format().check_declared(config)?;
        self.validate_extra(config)
    }

    /// Type-specific checks beyond the schema.
    fn validate_extra(&self, _config: &DeclaredConfig) -> recon_meta::Result<()> {
        Ok(())
    }

    /// Whether any attribute can be changed in place.
    fn supports_update(&self) -> bool {
        self.schema().has_mutable_attributes()
    }

    /// Create the remote object. The returned identifier is taken from the
    /// response plus scoping values from `config`.
    async fn create(
        &self,
        remote: &Remote<'_>,
        config: &DeclaredConfig,
    ) -> ResourceResult<RemoteState>;

    /// Read the remote object. `None` means the remote reported it absent.
    async fn read(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Option<RemoteState>>;

    async fn update(
        &self,
        _remote: &Remote<'_>,
        _id: &[String],
        _config: &DeclaredConfig,
    ) -> ResourceResult<()> {
        Err(ErrorKind::ImmutableResource {
            reason: format!("{} must be replaced to change", self.type_name()),
        })
    }

    /// Delete the remote object. `NotFound` is not an error.
    async fn delete(&self, remote: &Remote<'_>, id: &[String]) -> ResourceResult<Outcome<()>>;
}

/// Remote call handle for one engine operation.
///
/// Wraps the client with the caller's context so object types never forget
/// to pass it, and converts client errors into the engine taxonomy.
pub struct Remote<'a> {
    client: &'a dyn RemoteClient,
    ctx: &'a CallContext,
    page_size: u32,
    probe: Option<&'a MemoizedProbe>,
}

impl<'a> Remote<'a> {
    pub fn new(client: &'a dyn RemoteClient, ctx: &'a CallContext, page_size: u32) -> Self {
        Self {
            client,
            ctx,
            page_size,
            probe: None,
        }
    }

    /// Answer version probes from `probe` instead of asking every time.
    pub fn with_probe(mut self, probe: &'a MemoizedProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn client(&self) -> &dyn RemoteClient {
        self.client
    }

    pub fn ctx(&self) -> &CallContext {
        self.ctx
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub async fn create(&self, kind: &str, scope: &[String], payload: Value) -> ResourceResult<Value> {
        Ok(self.client.create(kind, scope, payload, self.ctx).await?)
    }

    pub async fn get(&self, kind: &str, key: &[String]) -> ResourceResult<Outcome<Value>> {
        Ok(self.client.get(kind, key, self.ctx).await?)
    }

    pub async fn update(&self, kind: &str, key: &[String], payload: Value) -> ResourceResult<Value> {
        Ok(self.client.update(kind, key, payload, self.ctx).await?)
    }

    pub async fn delete(&self, kind: &str, key: &[String]) -> ResourceResult<Outcome<()>> {
        Ok(self.client.delete(kind, key, self.ctx).await?)
    }

    /// Scan a paginated collection for the first item matching `matches`.
    ///
    /// Pages are fetched one after another starting at page 1. The scan
    /// stops at the first match, or when the remote reports no further page.
    /// An exhausted scan is `NotFound`.
    pub async fn find_in_pages<F>(
        &self,
        kind: &str,
        scope: &[String],
        matches: F,
    ) -> ResourceResult<Outcome<Value>>
    where
        F: Fn(&Value) -> bool + Send + Sync,
    {
        let mut page = 1;
        let mut consumed = 0u32;
        loop {
            let current = self
                .client
                .list_page(kind, scope, page, self.page_size, self.ctx)
                .await?;
            consumed += 1;

            if let Some(found) = current.items.into_iter().find(|item| matches(item)) {
                tracing::debug!(kind, page, pages = consumed, "List scan matched");
                return Ok(Outcome::Found(found));
            }

            match current.next_page.filter(|next| *next > 0) {
                Some(next) => page = next,
                None => {
                    tracing::debug!(kind, pages = consumed, "List scan exhausted");
                    return Ok(Outcome::NotFound);
                }
            }
        }
    }

    /// Parsed version of the connected remote.
    pub async fn version(&self) -> ResourceResult<CapabilityDescriptor> {
        match self.probe {
            Some(probe) => probe.probe(self.client, self.ctx).await,
            None => VersionProbe.probe(self.client, self.ctx).await,
        }
    }

    /// Fail with `CapabilityUnavailable` unless the remote is at least
    /// `minimum`.
    pub async fn require_version(
        &self,
        capability: &str,
        minimum: CapabilityDescriptor,
    ) -> ResourceResult<()> {
        let current = self.version().await?;
        gate::check(capability, current, minimum)
    }
}

/// Extract a string field from a remote response.
pub fn response_str(value: &Value, field: &str) -> ResourceResult<String> {
    match value.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ErrorKind::invalid_response(format!(
            "response has no {field} field"
        ))),
    }
}

/// Copy `fields` from a remote response into tracked attributes.
pub fn pick(value: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|field| value.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect()
}
