//! Resource type registry

use std::collections::BTreeMap;
use std::sync::Arc;

use recon_meta::ResourceSchema;

use crate::error::DuplicateType;
use crate::resource::Reconcilable;

/// Explicit registry of object types, keyed by type name.
///
/// Each backend builds its own registry at construction; there is no global
/// table.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Reconcilable>>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object type.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateType`] if another type already uses the same
    /// type name. The registry is left unchanged.
    pub fn register(&mut self, resource: Arc<dyn Reconcilable>) -> Result<(), DuplicateType> {
        let type_name = resource.type_name();
        if self.resources.contains_key(type_name) {
            return Err(DuplicateType {
                type_name: type_name.to_string(),
            });
        }
        tracing::debug!(type_name, "Registered resource type");
        self.resources.insert(type_name.to_string(), resource);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, resource: impl Reconcilable + 'static) -> Result<Self, DuplicateType> {
        self.register(Arc::new(resource))?;
        Ok(self)
    }

    /// Look up an object type by name.
    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn Reconcilable>> {
        self.resources.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.resources.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Schemas of every registered type, sorted by type name.
    pub fn schemas(&self) -> Vec<ResourceSchema> {
        self.resources.values().map(|r| r.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Registered object types, sorted by type name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Reconcilable>> {
        self.resources.values()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Remote, RemoteState, ResourceResult};
    use async_trait::async_trait;
    use recon_client::Outcome;
    use recon_meta::{DeclaredConfig, IdFormat};

    struct Stub(&'static str);

    #[async_trait]
    impl Reconcilable for Stub {
        fn type_name(&self) -> &'static str {
            self.0
        }

        fn id_format(&self) -> IdFormat {
            IdFormat::new(&["id"])
        }

        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new(self.0, self.id_format())
        }

        async fn create(&self, _: &Remote<'_>, _: &DeclaredConfig) -> ResourceResult<RemoteState> {
            unimplemented!()
        }

        async fn read(&self, _: &Remote<'_>, _: &[String]) -> ResourceResult<Option<RemoteState>> {
            unimplemented!()
        }

        async fn delete(&self, _: &Remote<'_>, _: &[String]) -> ResourceResult<Outcome<()>> {
            unimplemented!()
        }
    }

    #[test]
    fn empty_registry() {
        let registry = ResourceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("anything").is_none());
    }

    #[test]
    fn register_and_list_sorted() {
        let registry = ResourceRegistry::new()
            .with(Stub("pages_domain"))
            .unwrap()
            .with(Stub("application"))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.type_names(), vec!["application", "pages_domain"]);
        assert!(registry.contains("application"));
        let schemas = registry.schemas();
        assert_eq!(schemas[0].type_name, "application");
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(Stub("application"))).unwrap();
        let err = registry.register(Arc::new(Stub("application"))).unwrap_err();
        assert_eq!(err.type_name, "application");
        assert_eq!(registry.len(), 1);
    }
}
