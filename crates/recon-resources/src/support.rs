//! Helpers shared by the object types

use recon_core::ErrorKind;
use recon_meta::{AccessFamily, AccessLevel, AttrValue, DeclaredConfig};
use serde_json::{Value, json};

/// Whether `name` is declared with a concrete value.
pub(crate) fn is_known(config: &DeclaredConfig, name: &str) -> bool {
    matches!(config.get(name), Some(AttrValue::Known(_)))
}

/// Validate every name in a declared access-level set against `family`.
///
/// Unknown values are skipped; they are checked once known.
pub(crate) fn check_access_levels(
    config: &DeclaredConfig,
    name: &str,
    family: AccessFamily,
) -> recon_meta::Result<()> {
    if !is_known(config, name) {
        return Ok(());
    }
    for level in config.string_set(name)? {
        family.parse(&level)?;
    }
    Ok(())
}

/// Declared access-level names to the remote's `[{"access_level": n}]` shape.
pub(crate) fn access_levels_to_wire(
    config: &DeclaredConfig,
    name: &str,
    family: AccessFamily,
) -> recon_meta::Result<Vec<Value>> {
    config
        .string_set(name)?
        .iter()
        .map(|level| family.parse(level).map(|l| json!({"access_level": l.value()})))
        .collect()
}

/// The remote's access-level objects back to canonical names, sorted.
pub(crate) fn access_levels_from_wire(value: Option<&Value>) -> Result<Vec<String>, ErrorKind> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut names = items
        .iter()
        .map(|item| -> Result<String, ErrorKind> {
            let code = item
                .get("access_level")
                .and_then(Value::as_i64)
                .ok_or_else(|| ErrorKind::invalid_response("access level entry has no access_level"))?;
            Ok(AccessLevel::from_value(code)?.name().to_string())
        })
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    names.dedup();
    Ok(names)
}
