//! Built-in object types.
//!
//! Types are grouped into the two registries the multiplexer serves:
//!
//! - [`legacy_registry`]: applications, static-site domains and the
//!   emails-on-push integration
//! - [`framework_registry`]: protected environments and compliance frameworks
//!
//! A type belongs to exactly one registry.

pub mod application;
pub mod compliance_framework;
pub mod emails_on_push;
pub mod pages_domain;
pub mod protected_environment;

mod support;

pub use application::Application;
pub use compliance_framework::ComplianceFramework;
pub use emails_on_push::EmailsOnPush;
pub use pages_domain::PagesDomain;
pub use protected_environment::ProtectedEnvironment;

use recon_core::{DuplicateType, ResourceRegistry};

/// Registry of the types served by the legacy backend.
pub fn legacy_registry() -> Result<ResourceRegistry, DuplicateType> {
    ResourceRegistry::default()
        .with(Application)?
        .with(PagesDomain)?
        .with(EmailsOnPush)
}

/// Registry of the types served by the framework backend.
pub fn framework_registry() -> Result<ResourceRegistry, DuplicateType> {
    ResourceRegistry::default()
        .with(ProtectedEnvironment)?
        .with(ComplianceFramework)
}
