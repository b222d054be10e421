//! Change planning
//!
//! Compares a prior tracked state with a proposed declaration and decides
//! what the engine has to do. Planning never touches the remote.

use recon_meta::{AttrKind, AttrValue, AttributeSchema, DeclaredConfig, ResourceSchema, attributes_equivalent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::TrackedState;

/// What applying a planned change does to the remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    NoOp,
    Create,
    Update,
    /// Delete then create; a `force_new` attribute changed
    Replace,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::NoOp => "no-op",
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Replace => "replace",
            ChangeAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of planning one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChange {
    pub action: ChangeAction,
    /// Attributes whose declared value differs from tracked state
    #[serde(default)]
    pub changed: Vec<String>,
    /// Changed attributes that force replacement
    #[serde(default)]
    pub requires_replace: Vec<String>,
    /// Expected state after apply. Values the remote will compute are Unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned: Option<DeclaredConfig>,
}

/// Plan the change from `prior` to `proposed`.
///
/// - no prior, no proposal: no-op
/// - no prior: create; computed-only attributes are planned as Unknown
/// - no proposal: delete
/// - otherwise update, or replace when a `force_new` attribute changed
pub fn plan_change(
    schema: &ResourceSchema,
    prior: Option<&TrackedState>,
    proposed: Option<&DeclaredConfig>,
) -> PlannedChange {
    match (prior, proposed) {
        (None, None) => PlannedChange {
            action: ChangeAction::NoOp,
            changed: Vec::new(),
            requires_replace: Vec::new(),
            planned: None,
        },
        (None, Some(config)) => PlannedChange {
            action: ChangeAction::Create,
            changed: declared_names(schema, config),
            requires_replace: Vec::new(),
            planned: Some(planned_fresh(schema, config)),
        },
        (Some(_), None) => PlannedChange {
            action: ChangeAction::Delete,
            changed: Vec::new(),
            requires_replace: Vec::new(),
            planned: None,
        },
        (Some(state), Some(config)) => {
            let changed: Vec<String> = schema
                .attributes
                .iter()
                .filter(|a| !a.is_computed_only() && differs(a, state, config))
                .map(|a| a.name.clone())
                .collect();
            let requires_replace: Vec<String> = changed
                .iter()
                .filter(|name| schema.get(name).is_some_and(|a| a.force_new))
                .cloned()
                .collect();

            let (action, planned) = if !requires_replace.is_empty() {
                (ChangeAction::Replace, planned_fresh(schema, config))
            } else if !changed.is_empty() {
                (ChangeAction::Update, planned_update(schema, state, config))
            } else {
                (ChangeAction::NoOp, planned_update(schema, state, config))
            };

            PlannedChange {
                action,
                changed,
                requires_replace,
                planned: Some(planned),
            }
        }
    }
}

fn declared_names(schema: &ResourceSchema, config: &DeclaredConfig) -> Vec<String> {
    schema
        .attributes
        .iter()
        .filter(|a| config.get(&a.name).is_some_and(|v| !v.is_null()))
        .map(|a| a.name.clone())
        .collect()
}

fn differs(attribute: &AttributeSchema, state: &TrackedState, config: &DeclaredConfig) -> bool {
    let prior = state.get(&attribute.name).filter(|v| !is_empty(attribute.kind, v));
    match config.get(&attribute.name) {
        Some(AttrValue::Unknown) => true,
        None | Some(AttrValue::Null) => {
            // Optional+computed attributes keep whatever the remote chose.
            !attribute.computed && prior.is_some()
        }
        Some(AttrValue::Known(value)) => match prior {
            Some(prior) => !attributes_equivalent(attribute.kind, value, prior),
            None => !is_empty(attribute.kind, value),
        },
    }
}

fn is_empty(kind: AttrKind, value: &Value) -> bool {
    match kind {
        AttrKind::StringList | AttrKind::StringSet => value.as_array().is_some_and(Vec::is_empty),
        _ => value.is_null(),
    }
}

fn planned_fresh(schema: &ResourceSchema, config: &DeclaredConfig) -> DeclaredConfig {
    schema
        .attributes
        .iter()
        .filter_map(|a| {
            if a.is_computed_only() {
                return Some((a.name.clone(), AttrValue::Unknown));
            }
            match config.get(&a.name) {
                Some(value) if !value.is_null() => Some((a.name.clone(), value.clone())),
                _ if a.computed => Some((a.name.clone(), AttrValue::Unknown)),
                _ => None,
            }
        })
        .collect()
}

fn planned_update(schema: &ResourceSchema, state: &TrackedState, config: &DeclaredConfig) -> DeclaredConfig {
    schema
        .attributes
        .iter()
        .filter_map(|a| {
            let declared = config.get(&a.name).filter(|v| !v.is_null());
            match declared {
                Some(value) if !a.is_computed_only() => Some((a.name.clone(), value.clone())),
                _ => state
                    .get(&a.name)
                    .map(|v| (a.name.clone(), AttrValue::Known(v.clone()))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    fn schema() -> ResourceSchema {
        ResourceSchema::new("pages_domain", "<project>:<domain>")
            .attribute(AttributeSchema::string("project").required().force_new())
            .attribute(AttributeSchema::string("domain").required().force_new())
            .attribute(AttributeSchema::bool("auto_ssl_enabled").computed().optional())
            .attribute(AttributeSchema::string("url").computed())
            .attribute(AttributeSchema::string_set("tags"))
    }

    fn state(value: Value) -> TrackedState {
        let attributes: Map<String, Value> = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        TrackedState::new("pages_domain", "g/p:docs.example.com", attributes)
    }

    fn prior() -> TrackedState {
        state(json!({
            "project": "g/p",
            "domain": "docs.example.com",
            "auto_ssl_enabled": false,
            "url": "https://docs.example.com",
            "tags": ["a", "b"],
        }))
    }

    #[test]
    fn create_plans_computed_as_unknown() {
        let config = DeclaredConfig::from_json(json!({
            "project": "g/p",
            "domain": "docs.example.com",
        }));
        let change = plan_change(&schema(), None, Some(&config));
        assert_eq!(change.action, ChangeAction::Create);
        let planned = change.planned.unwrap();
        assert_eq!(planned.get("url"), Some(&AttrValue::Unknown));
        assert_eq!(planned.get("auto_ssl_enabled"), Some(&AttrValue::Unknown));
        assert_eq!(planned.get("tags"), None);
    }

    #[test]
    fn unchanged_declaration_is_noop() {
        let config = DeclaredConfig::from_json(json!({
            "project": "g/p",
            "domain": "docs.example.com",
            "tags": ["b", "a"],
        }));
        let change = plan_change(&schema(), Some(&prior()), Some(&config));
        assert_eq!(change.action, ChangeAction::NoOp);
        assert!(change.changed.is_empty());
    }

    #[test]
    fn mutable_attribute_is_update() {
        let config = DeclaredConfig::from_json(json!({
            "project": "g/p",
            "domain": "docs.example.com",
            "auto_ssl_enabled": true,
            "tags": ["a", "b"],
        }));
        let change = plan_change(&schema(), Some(&prior()), Some(&config));
        assert_eq!(change.action, ChangeAction::Update);
        assert_eq!(change.changed, vec!["auto_ssl_enabled".to_string()]);
        let planned = change.planned.unwrap();
        assert_eq!(
            planned.get("url"),
            Some(&AttrValue::Known(json!("https://docs.example.com")))
        );
    }

    #[test]
    fn force_new_attribute_is_replace() {
        let config = DeclaredConfig::from_json(json!({
            "project": "g/p",
            "domain": "www.example.com",
            "tags": ["a", "b"],
        }));
        let change = plan_change(&schema(), Some(&prior()), Some(&config));
        assert_eq!(change.action, ChangeAction::Replace);
        assert_eq!(change.requires_replace, vec!["domain".to_string()]);
    }

    #[test]
    fn dropping_set_members_is_update() {
        let config = DeclaredConfig::from_json(json!({
            "project": "g/p",
            "domain": "docs.example.com",
        }));
        let change = plan_change(&schema(), Some(&prior()), Some(&config));
        assert_eq!(change.action, ChangeAction::Update);
        assert_eq!(change.changed, vec!["tags".to_string()]);
    }

    #[test]
    fn unknown_value_counts_as_change() {
        let config: DeclaredConfig = serde_json::from_value(json!({
            "project": "g/p",
            "domain": "docs.example.com",
            "tags": {"$unknown": true},
        }))
        .unwrap();
        let change = plan_change(&schema(), Some(&prior()), Some(&config));
        assert_eq!(change.action, ChangeAction::Update);
    }

    #[test]
    fn no_declaration_is_delete() {
        let change = plan_change(&schema(), Some(&prior()), None);
        assert_eq!(change.action, ChangeAction::Delete);
        assert!(change.planned.is_none());
        assert_eq!(plan_change(&schema(), None, None).action, ChangeAction::NoOp);
    }
}
