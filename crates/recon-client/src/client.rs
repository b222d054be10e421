//! The remote client boundary
//!
//! The reconciler never talks HTTP itself. Every call to the remote system
//! goes through [`RemoteClient`], which an already-configured transport
//! implements. Objects are addressed by a `kind` (the remote collection,
//! e.g. `"pages_domain"`) and a key path of scoping components followed by
//! the object's own key, e.g. `["group/site", "docs.example.com"]`.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::CallContext;
use crate::error::Result;
use crate::outcome::{Outcome, Page};

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Create an object inside `scope` and return the remote representation.
    async fn create(&self, kind: &str, scope: &[String], payload: Value, ctx: &CallContext)
    -> Result<Value>;

    /// Fetch one object. An explicit 404 is [`Outcome::NotFound`].
    async fn get(&self, kind: &str, key: &[String], ctx: &CallContext) -> Result<Outcome<Value>>;

    /// Modify an object in place and return the remote representation.
    async fn update(&self, kind: &str, key: &[String], payload: Value, ctx: &CallContext)
    -> Result<Value>;

    /// Remove an object. An explicit 404 is [`Outcome::NotFound`].
    async fn delete(&self, kind: &str, key: &[String], ctx: &CallContext) -> Result<Outcome<()>>;

    /// Fetch one page (1-based) of the collection under `scope`.
    async fn list_page(
        &self,
        kind: &str,
        scope: &[String],
        page: u32,
        per_page: u32,
        ctx: &CallContext,
    ) -> Result<Page>;

    /// Version string of the connected remote system, e.g. `16.4.1-ee`.
    async fn get_version(&self, ctx: &CallContext) -> Result<String>;
}
