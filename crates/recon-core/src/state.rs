//! Tracked state: the locally persisted record of a remote object

use chrono::{DateTime, Utc};
use recon_meta::{ResourceSchema, attributes_equivalent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last-known attributes of a remote object plus its composite identifier.
///
/// Null attributes are dropped on construction: an absent attribute and a
/// null one mean the same thing, and the ledger format has no null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedState {
    /// Object type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Composite identifier
    pub id: String,
    /// When the attributes were last read from the remote
    pub refreshed_at: DateTime<Utc>,
    /// Attribute values as last observed
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl TrackedState {
    pub fn new(
        type_name: impl Into<String>,
        id: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            refreshed_at: Utc::now(),
            attributes: attributes
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Whether two states describe the same remote object with the same
    /// remotely verifiable attributes.
    ///
    /// Only attributes declared in `schema` are compared, and unordered
    /// collections compare as sets. `refreshed_at` is ignored.
    pub fn equivalent(&self, other: &TrackedState, schema: &ResourceSchema) -> bool {
        if self.type_name != other.type_name || self.id != other.id {
            return false;
        }
        schema.attributes.iter().all(|attribute| {
            let a = self.attributes.get(&attribute.name).unwrap_or(&Value::Null);
            let b = other.attributes.get(&attribute.name).unwrap_or(&Value::Null);
            attributes_equivalent(attribute.kind, a, b)
        })
    }
}

/// Result of reading a tracked object back from the remote.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The object exists; here is its current state
    Tracked(TrackedState),
    /// The remote reported the object as not found. The caller must drop it
    /// from tracked state.
    Absent,
}

impl ReadOutcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }

    pub fn into_state(self) -> Option<TrackedState> {
        match self {
            ReadOutcome::Tracked(state) => Some(state),
            ReadOutcome::Absent => None,
        }
    }
}
