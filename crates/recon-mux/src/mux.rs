//! Protocol multiplexer
//!
//! Presents several backends as one [`ProviderServer`]. Each object type is
//! owned by exactly one backend; schema and configure calls fan out to all of
//! them, every other call goes to the owner of the request's type.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use recon_client::CallContext;

use crate::backend::{BackendFactory, ProviderServer};
use crate::protocol::{
    ApplyRequest, ApplyResponse, ConfigureRequest, ConfigureResponse, Diagnostic, GetSchemaResponse,
    ImportRequest, ImportResponse, PlanRequest, PlanResponse, ReadRequest, ReadResponse,
    TypedRequest, ValidateRequest, ValidateResponse,
};
use crate::{Error, Result};

/// Router over a fixed set of backends.
///
/// Holds no object state. The routing table is built once at construction
/// and never changes.
pub struct MuxServer {
    backends: Vec<Arc<dyn ProviderServer>>,
    routes: BTreeMap<String, usize>,
}

impl MuxServer {
    /// Construct every backend and build the routing table.
    ///
    /// Fails on the first backend that cannot be constructed, and when two
    /// backends declare the same object type.
    pub async fn new(factories: Vec<BackendFactory>) -> Result<Self> {
        let mut backends = Vec::with_capacity(factories.len());
        for factory in factories {
            tracing::debug!(backend = factory.name(), "Constructing backend");
            backends.push(factory.build().await?);
        }
        Self::from_backends(backends).await
    }

    /// Build the routing table over already-constructed backends.
    pub async fn from_backends(backends: Vec<Arc<dyn ProviderServer>>) -> Result<Self> {
        let mut routes: BTreeMap<String, usize> = BTreeMap::new();
        for (index, backend) in backends.iter().enumerate() {
            let schema = backend.get_schema().await;
            for type_name in schema.resource_schemas.into_keys() {
                if let Some(&owner) = routes.get(&type_name) {
                    return Err(Error::ConfigurationConflict {
                        type_name,
                        first: backends[owner].name().to_string(),
                        second: backend.name().to_string(),
                    });
                }
                routes.insert(type_name, index);
            }
        }

        tracing::info!(
            backends = backends.len(),
            types = routes.len(),
            "Multiplexer ready"
        );
        Ok(Self { backends, routes })
    }

    /// Object types served, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    /// Name of the backend owning `type_name`.
    pub fn owner(&self, type_name: &str) -> Option<&str> {
        self.routes
            .get(type_name)
            .map(|&index| self.backends[index].name())
    }

    fn route(&self, request: &impl TypedRequest) -> Result<&Arc<dyn ProviderServer>> {
        let type_name = request.type_name();
        let index = self
            .routes
            .get(type_name)
            .ok_or_else(|| Error::UnownedType(type_name.to_string()))?;
        let backend = &self.backends[*index];
        tracing::debug!(type_name, backend = backend.name(), "Routing request");
        Ok(backend)
    }
}

#[async_trait]
impl ProviderServer for MuxServer {
    fn name(&self) -> &str {
        "mux"
    }

    async fn get_schema(&self) -> GetSchemaResponse {
        let mut merged = GetSchemaResponse::default();
        let mut owners: BTreeMap<String, &str> = BTreeMap::new();
        for backend in &self.backends {
            let response = backend.get_schema().await;
            merged.diagnostics.extend(response.diagnostics);
            for (type_name, schema) in response.resource_schemas {
                if let Some(first) = owners.get(&type_name) {
                    merged.diagnostics.push(
                        Diagnostic::error(
                            format!("Object type {type_name} is declared twice"),
                            format!("declared by both {first} and {}", backend.name()),
                        )
                        .with_kind("configuration_conflict"),
                    );
                    continue;
                }
                owners.insert(type_name.clone(), backend.name());
                merged.resource_schemas.insert(type_name, schema);
            }
        }
        merged
    }

    async fn configure(&self, request: ConfigureRequest) -> Result<ConfigureResponse> {
        let mut merged = ConfigureResponse::default();
        for backend in &self.backends {
            let response = backend.configure(request.clone()).await?;
            merged.diagnostics.extend(response.diagnostics);
        }
        Ok(merged)
    }

    async fn validate(&self, request: ValidateRequest) -> Result<ValidateResponse> {
        self.route(&request)?.validate(request).await
    }

    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse> {
        self.route(&request)?.plan(request).await
    }

    async fn apply(&self, request: ApplyRequest, ctx: &CallContext) -> Result<ApplyResponse> {
        self.route(&request)?.apply(request, ctx).await
    }

    async fn import(&self, request: ImportRequest, ctx: &CallContext) -> Result<ImportResponse> {
        self.route(&request)?.import(request, ctx).await
    }

    async fn read(&self, request: ReadRequest, ctx: &CallContext) -> Result<ReadResponse> {
        self.route(&request)?.read(request, ctx).await
    }
}

impl std::fmt::Debug for MuxServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backends: Vec<&str> = self.backends.iter().map(|b| b.name()).collect();
        f.debug_struct("MuxServer")
            .field("backends", &backends)
            .field("routes", &self.routes)
            .finish()
    }
}
