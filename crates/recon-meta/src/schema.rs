//! Resource schema declarations
//!
//! Each object type declares the attributes it understands. The schema is
//! used for three things: validating declared configuration, deciding which
//! attribute changes force replacement, and comparing states for
//! equivalence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{AttrValue, DeclaredConfig};
use crate::{Error, Result};

/// Attribute value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    String,
    Bool,
    Int,
    /// Ordered list of strings; position matters.
    StringList,
    /// Unordered collection of strings; compared by set-equality.
    StringSet,
}

impl AttrKind {
    fn describe(&self) -> &'static str {
        match self {
            AttrKind::String => "a string",
            AttrKind::Bool => "a boolean",
            AttrKind::Int => "an integer",
            AttrKind::StringList | AttrKind::StringSet => "a list of strings",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            AttrKind::String => value.is_string(),
            AttrKind::Bool => value.is_boolean(),
            AttrKind::Int => value.is_i64(),
            AttrKind::StringList | AttrKind::StringSet => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

/// One attribute of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    pub name: String,
    pub kind: AttrKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub force_new: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            optional: true,
            computed: false,
            force_new: false,
            sensitive: false,
            description: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttrKind::String)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, AttrKind::Bool)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, AttrKind::Int)
    }

    pub fn string_set(name: impl Into<String>) -> Self {
        Self::new(name, AttrKind::StringSet)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Set by the remote system. Chain [`optional`](Self::optional) to also
    /// let the operator declare it.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Only the remote system sets this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Full schema of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    pub type_name: String,
    pub version: u32,
    /// Rendered identifier format, e.g. `<project>:<domain>`.
    pub id_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    pub fn new(type_name: impl Into<String>, id_format: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            version: 0,
            id_format: id_format.to_string(),
            description: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether any declarable attribute can change without replacement.
    pub fn has_mutable_attributes(&self) -> bool {
        self.attributes
            .iter()
            .any(|a| !a.is_computed_only() && !a.force_new)
    }

    /// Validate a declared configuration against this schema.
    ///
    /// Unknown values pass: they are checked again once known.
    pub fn validate(&self, config: &DeclaredConfig) -> Result<()> {
        for (name, value) in config.iter() {
            let attribute = self.get(name).ok_or_else(|| Error::UnexpectedAttribute {
                attribute: name.clone(),
            })?;
            if let AttrValue::Known(v) = value {
                if attribute.is_computed_only() {
                    return Err(Error::InvalidValue {
                        attribute: name.clone(),
                        message: "attribute is computed by the remote system".to_string(),
                    });
                }
                if !attribute.kind.accepts(v) {
                    return Err(Error::AttributeType {
                        attribute: name.clone(),
                        expected: attribute.kind.describe().to_string(),
                    });
                }
            }
        }

        for attribute in self.attributes.iter().filter(|a| a.required) {
            match config.get(&attribute.name) {
                None | Some(AttrValue::Null) => {
                    return Err(Error::MissingAttribute {
                        attribute: attribute.name.clone(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Compare two concrete attribute values the way the schema says they compare.
///
/// `StringSet` values compare as sets, so remote responses that reorder
/// members do not register as drift.
pub fn attributes_equivalent(kind: AttrKind, a: &Value, b: &Value) -> bool {
    match kind {
        AttrKind::StringSet => match (a.as_array(), b.as_array()) {
            (Some(left), Some(right)) => {
                let left: BTreeSet<_> = left.iter().filter_map(Value::as_str).collect();
                let right: BTreeSet<_> = right.iter().filter_map(Value::as_str).collect();
                left == right
            }
            _ => a == b,
        },
        _ => a == b,
    }
}
