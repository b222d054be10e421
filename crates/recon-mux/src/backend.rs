//! Backend protocol servers
//!
//! [`ProviderServer`] is the control-plane protocol as one backend serves
//! it. [`EngineServer`] is the backend built on the reconciliation engine;
//! the multiplexer is another implementation of the same trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use recon_client::{CallContext, RemoteClient};
use recon_core::{
    Engine, Error as EngineError, ErrorKind, Operation, ReadOutcome, Reconcilable, ResourceRegistry,
    plan_change,
};
use recon_meta::DeclaredConfig;

use crate::protocol::{
    ApplyRequest, ApplyResponse, ConfigureRequest, ConfigureResponse, Diagnostic, GetSchemaResponse,
    ImportRequest, ImportResponse, PlanRequest, PlanResponse, ReadRequest, ReadResponse,
    ValidateRequest, ValidateResponse, has_errors,
};
use crate::{BoxError, Error, Result};

/// One implementation of the control-plane protocol.
///
/// Object-level failures come back as diagnostics in the response; `Err` is
/// reserved for requests the server cannot handle at all.
#[async_trait]
pub trait ProviderServer: Send + Sync {
    fn name(&self) -> &str;

    async fn get_schema(&self) -> GetSchemaResponse;

    async fn configure(&self, request: ConfigureRequest) -> Result<ConfigureResponse>;

    async fn validate(&self, request: ValidateRequest) -> Result<ValidateResponse>;

    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse>;

    async fn apply(&self, request: ApplyRequest, ctx: &CallContext) -> Result<ApplyResponse>;

    async fn import(&self, request: ImportRequest, ctx: &CallContext) -> Result<ImportResponse>;

    async fn read(&self, request: ReadRequest, ctx: &CallContext) -> Result<ReadResponse>;
}

pub type BackendFuture = Pin<Box<dyn Future<Output = std::result::Result<Arc<dyn ProviderServer>, BoxError>> + Send>>;

/// Deferred construction of one backend.
pub struct BackendFactory {
    name: String,
    build: Box<dyn FnOnce() -> BackendFuture + Send>,
}

impl BackendFactory {
    pub fn new<F, Fut>(name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<Arc<dyn ProviderServer>, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            build: Box::new(move || Box::pin(build())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn build(self) -> Result<Arc<dyn ProviderServer>> {
        let backend = self.name;
        (self.build)()
            .await
            .map_err(|source| Error::BackendInit { backend, source })
    }
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendFactory").field("name", &self.name).finish()
    }
}

/// A backend serving the object types in one registry through an [`Engine`].
pub struct EngineServer {
    name: String,
    registry: ResourceRegistry,
    client: Arc<dyn RemoteClient>,
    engine: OnceLock<Engine>,
}

impl EngineServer {
    pub fn new(name: impl Into<String>, registry: ResourceRegistry, client: Arc<dyn RemoteClient>) -> Self {
        Self {
            name: name.into(),
            registry,
            client,
            engine: OnceLock::new(),
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn is_configured(&self) -> bool {
        self.engine.get().is_some()
    }

    fn resource(&self, type_name: &str) -> Result<&Arc<dyn Reconcilable>> {
        self.registry
            .get(type_name)
            .ok_or_else(|| Error::UnownedType(type_name.to_string()))
    }

    fn engine(&self) -> Result<&Engine> {
        self.engine
            .get()
            .ok_or_else(|| Error::NotConfigured(self.name.clone()))
    }
}

fn validation(resource: &dyn Reconcilable, config: &DeclaredConfig) -> Vec<Diagnostic> {
    match resource.validate(config) {
        Ok(()) => Vec::new(),
        Err(e) => {
            let err = EngineError::new(
                Operation::Validate,
                resource.type_name(),
                None,
                ErrorKind::InvalidConfig(e),
            );
            vec![Diagnostic::from(&err)]
        }
    }
}

#[async_trait]
impl ProviderServer for EngineServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_schema(&self) -> GetSchemaResponse {
        GetSchemaResponse {
            resource_schemas: self
                .registry
                .iter()
                .map(|r| (r.type_name().to_string(), r.schema()))
                .collect(),
            diagnostics: Vec::new(),
        }
    }

    async fn configure(&self, request: ConfigureRequest) -> Result<ConfigureResponse> {
        if self.is_configured() {
            return Err(Error::AlreadyConfigured(self.name.clone()));
        }
        let engine = request.config.check().and_then(|()| {
            Engine::from_config(self.client.clone(), &request.config).map_err(|e| e.to_string())
        });
        let engine = match engine {
            Ok(engine) => engine,
            Err(message) => {
                let diagnostic =
                    Diagnostic::error("Invalid provider configuration", message).with_kind("invalid_config");
                return Ok(ConfigureResponse {
                    diagnostics: vec![diagnostic],
                });
            }
        };
        self.engine
            .set(engine)
            .map_err(|_| Error::AlreadyConfigured(self.name.clone()))?;

        tracing::info!(backend = %self.name, page_size = request.config.page_size, "Backend configured");
        Ok(ConfigureResponse::default())
    }

    async fn validate(&self, request: ValidateRequest) -> Result<ValidateResponse> {
        let resource = self.resource(&request.type_name)?;
        Ok(ValidateResponse {
            diagnostics: validation(resource.as_ref(), &request.config),
        })
    }

    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse> {
        let resource = self.resource(&request.type_name)?;
        if let Some(config) = &request.proposed_config {
            let diagnostics = validation(resource.as_ref(), config);
            if has_errors(&diagnostics) {
                return Ok(PlanResponse {
                    change: None,
                    diagnostics,
                });
            }
        }
        let change = plan_change(
            &resource.schema(),
            request.prior_state.as_ref(),
            request.proposed_config.as_ref(),
        );
        tracing::debug!(type_name = %request.type_name, action = %change.action, "Planned change");
        Ok(PlanResponse {
            change: Some(change),
            diagnostics: Vec::new(),
        })
    }

    async fn apply(&self, request: ApplyRequest, ctx: &CallContext) -> Result<ApplyResponse> {
        let resource = self.resource(&request.type_name)?;
        let engine = self.engine()?;
        let resource = resource.as_ref();

        let response = match (request.prior_state, request.config) {
            (None, None) => ApplyResponse::default(),
            (None, Some(config)) => match engine.create(resource, &config, ctx).await {
                Ok(state) => ApplyResponse {
                    new_state: Some(state),
                    diagnostics: Vec::new(),
                },
                Err(e) => ApplyResponse {
                    new_state: None,
                    diagnostics: vec![Diagnostic::from(&e)],
                },
            },
            (Some(prior), None) => match engine.delete(resource, &prior.id, ctx).await {
                Ok(()) => ApplyResponse::default(),
                Err(e) => ApplyResponse {
                    new_state: Some(prior),
                    diagnostics: vec![Diagnostic::from(&e)],
                },
            },
            (Some(prior), Some(config)) => match engine.update(resource, &prior.id, &config, ctx).await {
                Ok(state) => ApplyResponse {
                    new_state: Some(state),
                    diagnostics: Vec::new(),
                },
                Err(e) => ApplyResponse {
                    new_state: Some(prior),
                    diagnostics: vec![Diagnostic::from(&e)],
                },
            },
        };
        Ok(response)
    }

    async fn import(&self, request: ImportRequest, ctx: &CallContext) -> Result<ImportResponse> {
        let resource = self.resource(&request.type_name)?;
        let engine = self.engine()?;

        let response = match engine.import(resource.as_ref(), &request.id, ctx).await {
            Ok(ReadOutcome::Tracked(state)) => ImportResponse {
                imported: Some(state),
                diagnostics: Vec::new(),
            },
            Ok(ReadOutcome::Absent) => {
                let err = EngineError::new(
                    Operation::Import,
                    request.type_name.as_str(),
                    Some(request.id.clone()),
                    ErrorKind::NotFound,
                );
                ImportResponse {
                    imported: None,
                    diagnostics: vec![Diagnostic::from(&err)],
                }
            }
            Err(e) => ImportResponse {
                imported: None,
                diagnostics: vec![Diagnostic::from(&e)],
            },
        };
        Ok(response)
    }

    async fn read(&self, request: ReadRequest, ctx: &CallContext) -> Result<ReadResponse> {
        let resource = self.resource(&request.type_name)?;
        let engine = self.engine()?;
        let current = request.current_state;

        let response = match engine.read(resource.as_ref(), &current.id, ctx).await {
            Ok(ReadOutcome::Tracked(state)) => ReadResponse {
                new_state: Some(state),
                diagnostics: Vec::new(),
            },
            Ok(ReadOutcome::Absent) => ReadResponse::default(),
            Err(e) => ReadResponse {
                new_state: Some(current),
                diagnostics: vec![Diagnostic::from(&e)],
            },
        };
        Ok(response)
    }
}

/// Factory for an [`EngineServer`] over a registry built at construction.
pub fn engine_backend<F, E>(name: &str, client: Arc<dyn RemoteClient>, registry: F) -> BackendFactory
where
    F: FnOnce() -> std::result::Result<ResourceRegistry, E> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let backend = name.to_string();
    BackendFactory::new(name, move || async move {
        let registry = registry().map_err(|e| Box::new(e) as BoxError)?;
        tracing::debug!(backend = %backend, types = ?registry.type_names(), "Constructed backend");
        Ok::<_, BoxError>(Arc::new(EngineServer::new(backend, registry, client)) as Arc<dyn ProviderServer>)
    })
}
