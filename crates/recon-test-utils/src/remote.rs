//! In-memory remote system.
//!
//! [`MemoryRemote`] behaves like a small REST backend:
//!
//! - objects live in collections addressed by `kind` and a key path
//! - keys are server-assigned numeric ids unless a kind is configured with
//!   [`MemoryRemote::key_field`], in which case the key is taken from the payload
//! - list calls page through a scope in insertion order
//! - every call is logged so tests can assert how many pages were consumed
//! - failures can be queued per operation with [`MemoryRemote::fail_next`]
//!
//! The double honours the call context: a cancelled token fails every call
//! with [`RemoteError::Cancelled`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use recon_client::{CallContext, Outcome, Page, RemoteClient, RemoteError, Result};
use serde_json::{Map, Value};

type WriteHook = Box<dyn Fn(&mut Map<String, Value>) + Send + Sync>;

#[derive(Debug, Clone)]
struct StoredObject {
    kind: String,
    key: Vec<String>,
    value: Value,
}

#[derive(Default)]
struct State {
    objects: Vec<StoredObject>,
    next_id: u64,
    calls: Vec<String>,
    failures: VecDeque<(String, RemoteError)>,
}

/// In-memory [`RemoteClient`] for tests.
pub struct MemoryRemote {
    version: Mutex<String>,
    key_fields: HashMap<String, String>,
    hooks: HashMap<String, WriteHook>,
    state: Mutex<State>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            version: Mutex::new("16.4.1-ee".to_string()),
            key_fields: HashMap::new(),
            hooks: HashMap::new(),
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
        }
    }

    /// Report this version from `get_version`.
    pub fn with_version(self, version: impl Into<String>) -> Self {
        self.set_version(version);
        self
    }

    /// Change the reported version, e.g. to simulate pointing at another endpoint.
    pub fn set_version(&self, version: impl Into<String>) {
        *self.version.lock().unwrap() = version.into();
    }

    /// Key objects of `kind` by the payload's `field` instead of an assigned id.
    pub fn key_field(mut self, kind: impl Into<String>, field: impl Into<String>) -> Self {
        self.key_fields.insert(kind.into(), field.into());
        self
    }

    /// Run `hook` on every object of `kind` after create and update, to
    /// simulate server-computed fields.
    pub fn on_write(
        mut self,
        kind: impl Into<String>,
        hook: impl Fn(&mut Map<String, Value>) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.insert(kind.into(), Box::new(hook));
        self
    }

    /// Fail the next call to `operation` (`create`, `get`, `update`,
    /// `delete`, `list_page` or `get_version`) with `error`.
    pub fn fail_next(&self, operation: &str, error: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push_back((operation.to_string(), error));
    }

    /// Insert an object directly, bypassing create.
    pub fn seed(&self, kind: &str, key: &[&str], value: Value) {
        let mut state = self.state.lock().unwrap();
        state.objects.push(StoredObject {
            kind: kind.to_string(),
            key: key.iter().map(|k| k.to_string()).collect(),
            value,
        });
    }

    /// Delete an object out of band, as another operator would.
    pub fn remove(&self, kind: &str, key: &[&str]) -> Option<Value> {
        let mut state = self.state.lock().unwrap();
        let pos = state
            .objects
            .iter()
            .position(|o| o.kind == kind && o.key == key)?;
        Some(state.objects.remove(pos).value)
    }

    /// Current remote representation of an object.
    pub fn object(&self, kind: &str, key: &[&str]) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .find(|o| o.kind == kind && o.key == key)
            .map(|o| o.value.clone())
    }

    /// Mutate an object out of band, as another operator would.
    pub fn patch(&self, kind: &str, key: &[&str], patch: Value) {
        let mut state = self.state.lock().unwrap();
        if let Some(stored) = state
            .objects
            .iter_mut()
            .find(|o| o.kind == kind && o.key == key)
        {
            merge(&mut stored.value, patch);
        }
    }

    /// Number of objects of `kind`.
    pub fn count(&self, kind: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.objects.iter().filter(|o| o.kind == kind).count()
    }

    /// Number of calls made to `operation`.
    pub fn calls(&self, operation: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    /// Total number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn begin(&self, operation: &str, ctx: &CallContext) -> Result<()> {
        ctx.ensure_active()?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        if let Some(pos) = state.failures.iter().position(|(op, _)| op == operation)
            && let Some((_, error)) = state.failures.remove(pos)
        {
            return Err(error);
        }
        Ok(())
    }

    fn apply_hook(&self, kind: &str, value: &mut Value) {
        if let (Some(hook), Value::Object(map)) = (self.hooks.get(kind), value) {
            hook(map);
        }
    }
}

fn merge(target: &mut Value, patch: Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (k, v) in patch {
            target.insert(k, v);
        }
    }
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn create(
        &self,
        kind: &str,
        scope: &[String],
        payload: Value,
        ctx: &CallContext,
    ) -> Result<Value> {
        self.begin("create", ctx)?;
        let mut value = payload;
        if !value.is_object() {
            return Err(RemoteError::status(400, "payload must be an object"));
        }

        let own_key = match self.key_fields.get(kind) {
            Some(field) => value
                .get(field)
                .and_then(key_string)
                .ok_or_else(|| RemoteError::status(400, format!("{field} is missing")))?,
            None => {
                let id = {
                    let mut state = self.state.lock().unwrap();
                    let id = state.next_id;
                    state.next_id += 1;
                    id
                };
                value["id"] = Value::from(id);
                id.to_string()
            }
        };

        let mut key = scope.to_vec();
        key.push(own_key);
        self.apply_hook(kind, &mut value);

        let mut state = self.state.lock().unwrap();
        if state.objects.iter().any(|o| o.kind == kind && o.key == key) {
            return Err(RemoteError::status(409, format!("{kind} already exists")));
        }
        state.objects.push(StoredObject {
            kind: kind.to_string(),
            key,
            value: value.clone(),
        });
        Ok(value)
    }

    async fn get(&self, kind: &str, key: &[String], ctx: &CallContext) -> Result<Outcome<Value>> {
        self.begin("get", ctx)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .iter()
            .find(|o| o.kind == kind && o.key == key)
            .map(|o| o.value.clone())
            .into())
    }

    async fn update(
        &self,
        kind: &str,
        key: &[String],
        payload: Value,
        ctx: &CallContext,
    ) -> Result<Value> {
        self.begin("update", ctx)?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .objects
            .iter_mut()
            .find(|o| o.kind == kind && o.key == key)
            .ok_or_else(|| RemoteError::status(404, format!("{kind} not found")))?;
        merge(&mut stored.value, payload);
        self.apply_hook(kind, &mut stored.value);
        Ok(stored.value.clone())
    }

    async fn delete(&self, kind: &str, key: &[String], ctx: &CallContext) -> Result<Outcome<()>> {
        self.begin("delete", ctx)?;
        let mut state = self.state.lock().unwrap();
        match state
            .objects
            .iter()
            .position(|o| o.kind == kind && o.key == key)
        {
            Some(pos) => {
                state.objects.remove(pos);
                Ok(Outcome::Found(()))
            }
            None => Ok(Outcome::NotFound),
        }
    }

    async fn list_page(
        &self,
        kind: &str,
        scope: &[String],
        page: u32,
        per_page: u32,
        ctx: &CallContext,
    ) -> Result<Page> {
        self.begin("list_page", ctx)?;
        let state = self.state.lock().unwrap();
        let members: Vec<&StoredObject> = state
            .objects
            .iter()
            .filter(|o| {
                o.kind == kind && o.key.len() == scope.len() + 1 && o.key.starts_with(scope)
            })
            .collect();

        let per_page = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1) * per_page;
        let items: Vec<Value> = members
            .iter()
            .skip(start)
            .take(per_page)
            .map(|o| o.value.clone())
            .collect();
        let next_page = (start + per_page < members.len()).then_some(page.max(1) + 1);

        Ok(Page { items, next_page })
    }

    async fn get_version(&self, ctx: &CallContext) -> Result<String> {
        self.begin("get_version", ctx)?;
        Ok(self.version.lock().unwrap().clone())
    }
}
