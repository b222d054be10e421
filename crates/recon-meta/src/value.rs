//! Declared configuration values
//!
//! A declared configuration is an immutable snapshot of operator intent for
//! one object: a map from attribute name to [`AttrValue`]. Each value is
//! unknown (to be computed during apply), null, or concrete.
//!
//! On the wire a value is plain JSON, with one reserved shape for unknown
//! values:
//!
//! ```text
//! null               -> AttrValue::Null
//! {"$unknown": true} -> AttrValue::Unknown
//! anything else      -> AttrValue::Known
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

const UNKNOWN_MARKER: &str = "$unknown";

/// A single attribute value in a declared configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum AttrValue {
    Unknown,
    Null,
    Known(Value),
}

impl AttrValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, AttrValue::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// The concrete value, if any.
    pub fn known(&self) -> Option<&Value> {
        match self {
            AttrValue::Known(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Object(ref map)
                if map.len() == 1 && map.get(UNKNOWN_MARKER) == Some(&Value::Bool(true)) =>
            {
                AttrValue::Unknown
            }
            other => AttrValue::Known(other),
        }
    }
}

impl From<AttrValue> for Value {
    fn from(value: AttrValue) -> Self {
        match value {
            AttrValue::Unknown => {
                let mut marker = Map::new();
                marker.insert(UNKNOWN_MARKER.to_string(), Value::Bool(true));
                Value::Object(marker)
            }
            AttrValue::Null => Value::Null,
            AttrValue::Known(v) => v,
        }
    }
}

/// Operator intent for one object instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclaredConfig {
    attributes: BTreeMap<String, AttrValue>,
}

impl DeclaredConfig {
    pub fn new(attributes: BTreeMap<String, AttrValue>) -> Self {
        Self { attributes }
    }

    /// Build a fully known configuration from a JSON object.
    ///
    /// Non-object input yields an empty configuration.
    pub fn from_json(value: Value) -> Self {
        let attributes = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, AttrValue::from(v)))
                .collect(),
            _ => BTreeMap::new(),
        };
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Whether any attribute is still unknown.
    pub fn has_unknowns(&self) -> bool {
        self.attributes.values().any(AttrValue::is_unknown)
    }

    /// Known values only, as a JSON object. Null and unknown values are left out.
    pub fn known_values(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .filter_map(|(k, v)| v.known().map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// A concrete value, failing if it is unknown. Null and absent map to `None`.
    fn concrete(&self, name: &str) -> Result<Option<&Value>> {
        match self.attributes.get(name) {
            None | Some(AttrValue::Null) => Ok(None),
            Some(AttrValue::Unknown) => Err(Error::UnknownValue {
                attribute: name.to_string(),
            }),
            Some(AttrValue::Known(v)) => Ok(Some(v)),
        }
    }

    pub fn required_str(&self, name: &str) -> Result<String> {
        self.optional_str(name)?
            .ok_or_else(|| Error::MissingAttribute {
                attribute: name.to_string(),
            })
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<String>> {
        match self.concrete(name)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(type_error(name, "a string")),
        }
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.concrete(name)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(type_error(name, "a boolean")),
        }
    }

    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.concrete(name)? {
            None => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| type_error(name, "an integer")),
        }
    }

    /// A list of strings collected into a set. Absent or null is the empty set.
    pub fn string_set(&self, name: &str) -> Result<BTreeSet<String>> {
        match self.concrete(name)? {
            None => Ok(BTreeSet::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(String::from)
                        .ok_or_else(|| type_error(name, "a list of strings"))
                })
                .collect(),
            Some(_) => Err(type_error(name, "a list of strings")),
        }
    }
}

impl FromIterator<(String, AttrValue)> for DeclaredConfig {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

fn type_error(name: &str, expected: &str) -> Error {
    Error::AttributeType {
        attribute: name.to_string(),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn wire_form_round_trips() {
        let raw = json!({
            "name": "docs",
            "description": null,
            "url": {"$unknown": true},
        });
        let config: DeclaredConfig = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(config.get("description"), Some(&AttrValue::Null));
        assert_eq!(config.get("url"), Some(&AttrValue::Unknown));
        assert_eq!(serde_json::to_value(&config).unwrap(), raw);
    }

    #[test]
    fn object_with_extra_keys_is_known() {
        let value = AttrValue::from(json!({"$unknown": true, "other": 1}));
        assert!(matches!(value, AttrValue::Known(_)));
    }

    #[test]
    fn typed_accessors() {
        let config = DeclaredConfig::from_json(json!({
            "name": "app",
            "confidential": true,
            "count": 2,
            "scopes": ["api", "read_user", "api"],
        }));
        assert_eq!(config.required_str("name").unwrap(), "app");
        assert_eq!(config.optional_bool("confidential").unwrap(), Some(true));
        assert_eq!(config.optional_i64("count").unwrap(), Some(2));
        assert_eq!(config.string_set("scopes").unwrap().len(), 2);
        assert_eq!(config.optional_str("missing").unwrap(), None);
    }

    #[test]
    fn accessors_reject_unknown_and_wrong_types() {
        let config: DeclaredConfig =
            serde_json::from_value(json!({"name": {"$unknown": true}, "count": "two"})).unwrap();
        assert!(matches!(
            config.required_str("name"),
            Err(Error::UnknownValue { .. })
        ));
        assert!(matches!(
            config.optional_i64("count"),
            Err(Error::AttributeType { .. })
        ));
        assert!(matches!(
            config.required_str("absent"),
            Err(Error::MissingAttribute { .. })
        ));
    }

    #[test]
    fn known_values_skip_null_and_unknown() {
        let config: DeclaredConfig =
            serde_json::from_value(json!({"a": 1, "b": null, "c": {"$unknown": true}})).unwrap();
        let known = config.known_values();
        assert_eq!(known.len(), 1);
        assert_eq!(known["a"], 1);
        assert!(config.has_unknowns());
    }
}
