//! Composite identifiers
//!
//! A composite identifier correlates a tracked object with its remote
//! counterpart across process restarts. It is built by joining one or more
//! components with [`DELIMITER`]:
//!
//! ```text
//! <project>:<environment>
//! ```
//!
//! The codec never normalizes components. A component that is empty or
//! contains the delimiter is rejected on both encode and decode, so every
//! identifier produced here decodes back to exactly the same components.
//!
//! # Example
//!
//! ```
//! use recon_meta::IdFormat;
//!
//! const FORMAT: IdFormat = IdFormat::new(&["project", "environment"]);
//!
//! let id = FORMAT.encode(&["group/app", "production"]).unwrap();
//! assert_eq!(id, "group/app:production");
//! assert_eq!(FORMAT.decode(&id).unwrap(), vec!["group/app", "production"]);
//! assert!(FORMAT.decode("group/app").is_err());
//! ```

use std::fmt;

use serde_json::Value;

use crate::value::{AttrValue, DeclaredConfig};
use crate::{Error, Result};

/// Separator between identifier components.
pub const DELIMITER: char = ':';

/// The shape of a composite identifier: an ordered list of component names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFormat {
    components: &'static [&'static str],
}

impl IdFormat {
    /// Create a format from its component names.
    pub const fn new(components: &'static [&'static str]) -> Self {
        Self { components }
    }

    /// Number of components an identifier of this format carries.
    pub fn arity(&self) -> usize {
        self.components.len()
    }

    /// Component names, in order.
    pub fn components(&self) -> &'static [&'static str] {
        self.components
    }

    /// Join components into an identifier.
    ///
    /// Fails with [`Error::MalformedIdentifier`] if the number of components
    /// does not match the format, or if any component is empty or contains
    /// the delimiter.
    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> Result<String> {
        let joined = parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string());

        if parts.len() != self.arity() {
            return Err(self.malformed(&joined));
        }
        if parts
            .iter()
            .any(|p| p.as_ref().is_empty() || p.as_ref().contains(DELIMITER))
        {
            return Err(self.malformed(&joined));
        }

        Ok(joined)
    }

    /// Split an identifier into its components.
    pub fn decode(&self, id: &str) -> Result<Vec<String>> {
        let parts: Vec<&str> = id.split(DELIMITER).collect();
        if parts.len() != self.arity() || parts.iter().any(|p| p.is_empty()) {
            return Err(self.malformed(id));
        }
        Ok(parts.into_iter().map(String::from).collect())
    }

    /// Decode a two-component identifier into a `(parent, child)` pair.
    pub fn decode_pair(&self, id: &str) -> Result<(String, String)> {
        if self.arity() != 2 {
            return Err(self.malformed(id));
        }
        let (parent, child) = id.split_once(DELIMITER).ok_or_else(|| self.malformed(id))?;
        if parent.is_empty() || child.is_empty() || child.contains(DELIMITER) {
            return Err(self.malformed(id));
        }
        Ok((parent.to_string(), child.to_string()))
    }

    /// Check the identifier components a declaration supplies itself.
    ///
    /// Component names double as attribute names: a `project` component is
    /// taken from the `project` attribute on create. Such values must be
    /// usable in an identifier before the remote object exists, otherwise
    /// the object could be created and never tracked. Components assigned
    /// by the remote, and values that are absent or not yet known, are
    /// skipped.
    pub fn check_declared(&self, config: &DeclaredConfig) -> Result<()> {
        for &name in self.components {
            let Some(AttrValue::Known(Value::String(value))) = config.get(name) else {
                continue;
            };
            if value.is_empty() || value.contains(DELIMITER) {
                return Err(Error::InvalidValue {
                    attribute: name.to_string(),
                    message: format!("{value:?} cannot be used in identifier {self}"),
                });
            }
        }
        Ok(())
    }

    fn malformed(&self, id: &str) -> Error {
        Error::MalformedIdentifier {
            id: id.to_string(),
            expected: self.to_string(),
        }
    }
}

impl fmt::Display for IdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.components.iter().map(|c| format!("<{c}>")).collect();
        f.write_str(&rendered.join(&DELIMITER.to_string()))
    }
}
