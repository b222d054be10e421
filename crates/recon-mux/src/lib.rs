//! Control-plane protocol server for the remote reconciler.
//!
//! Two independently evolving backends serve the object types, and the
//! multiplexer presents them to the orchestrator as one endpoint:
//!
//! ```text
//! [ orchestrator ]
//!        | (line-delimited JSON-RPC)
//!        v
//! [ ProtocolServer ]
//!        |
//!        v
//! [ MuxServer ] --routes by type name--+
//!        |                             |
//!        v                             v
//! [ EngineServer "legacy" ]   [ EngineServer "framework" ]
//!        |                             |
//!        +------> [ Engine ] <---------+
//!                     |
//!                     v
//!              [ RemoteClient ]
//! ```
//!
//! Schema and configure calls are broadcast; validate, plan, apply, import
//! and read go to the single backend owning the request's object type.

pub mod backend;
pub mod error;
pub mod logging;
pub mod mux;
pub mod protocol;
pub mod server;

use std::sync::Arc;

use recon_client::RemoteClient;

pub use backend::{BackendFactory, EngineServer, ProviderServer, engine_backend};
pub use error::{BoxError, Error, Result};
pub use mux::MuxServer;
pub use protocol::Diagnostic;
pub use server::ProtocolServer;

/// The two built-in backends, both talking to `client`.
pub fn default_backends(client: Arc<dyn RemoteClient>) -> Vec<BackendFactory> {
    vec![
        engine_backend("legacy", client.clone(), recon_resources::legacy_registry),
        engine_backend("framework", client, recon_resources::framework_registry),
    ]
}

/// Construct the multiplexer over the built-in backends.
pub async fn default_mux(client: Arc<dyn RemoteClient>) -> Result<MuxServer> {
    MuxServer::new(default_backends(client)).await
}
