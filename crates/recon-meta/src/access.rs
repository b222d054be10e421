//! Access level tables
//!
//! Maps human-readable access level names to the numeric codes the remote
//! system uses. The set is closed. The deprecated alias `master` is accepted
//! on input as [`AccessLevel::Maintainer`] but is never produced on output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Deprecated input-only alias for [`AccessLevel::Maintainer`].
pub const DEPRECATED_MAINTAINER_ALIAS: &str = "master";

/// Remote access level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[serde(rename = "no one")]
    NoOne,
    Minimal,
    Guest,
    Reporter,
    Developer,
    #[serde(alias = "master")]
    Maintainer,
    Owner,
    Admin,
}

impl AccessLevel {
    /// Every level, in privilege order.
    pub const ALL: [AccessLevel; 8] = [
        AccessLevel::NoOne,
        AccessLevel::Minimal,
        AccessLevel::Guest,
        AccessLevel::Reporter,
        AccessLevel::Developer,
        AccessLevel::Maintainer,
        AccessLevel::Owner,
        AccessLevel::Admin,
    ];

    /// Canonical name used on output.
    pub fn name(&self) -> &'static str {
        match self {
            AccessLevel::NoOne => "no one",
            AccessLevel::Minimal => "minimal",
            AccessLevel::Guest => "guest",
            AccessLevel::Reporter => "reporter",
            AccessLevel::Developer => "developer",
            AccessLevel::Maintainer => "maintainer",
            AccessLevel::Owner => "owner",
            AccessLevel::Admin => "admin",
        }
    }

    /// Numeric code used by the remote system.
    pub fn value(&self) -> i64 {
        match self {
            AccessLevel::NoOne => 0,
            AccessLevel::Minimal => 5,
            AccessLevel::Guest => 10,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
            AccessLevel::Admin => 60,
        }
    }

    /// Look up a level by name. Accepts the deprecated `master` alias.
    pub fn from_name(name: &str) -> Result<Self> {
        if name == DEPRECATED_MAINTAINER_ALIAS {
            return Ok(AccessLevel::Maintainer);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.name() == name)
            .ok_or_else(|| Error::UnknownAccessLevel {
                name: name.to_string(),
            })
    }

    /// Look up a level by its numeric code.
    pub fn from_value(value: i64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.value() == value)
            .ok_or(Error::UnknownAccessValue { value })
    }
}

impl FromStr for AccessLevel {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name to numeric code.
pub fn name_to_value(name: &str) -> Result<i64> {
    AccessLevel::from_name(name).map(|level| level.value())
}

/// Numeric code to canonical name.
pub fn value_to_name(value: i64) -> Result<&'static str> {
    AccessLevel::from_value(value).map(|level| level.name())
}

/// Resource families, each accepting a closed subset of access levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessFamily {
    /// Who may deploy to a protected environment.
    ProtectedEnvironmentDeploy,
    /// Project membership.
    ProjectMember,
    /// Group membership.
    GroupMember,
    /// Who may create protected tags.
    TagProtection,
}

impl AccessFamily {
    /// Levels accepted for this family.
    pub fn allowed(&self) -> &'static [AccessLevel] {
        use AccessLevel::*;
        match self {
            AccessFamily::ProtectedEnvironmentDeploy => &[Developer, Maintainer],
            AccessFamily::ProjectMember => &[Guest, Reporter, Developer, Maintainer, Owner],
            AccessFamily::GroupMember => &[Minimal, Guest, Reporter, Developer, Maintainer, Owner],
            AccessFamily::TagProtection => &[NoOne, Developer, Maintainer],
        }
    }

    /// Parse and validate a level name against this family.
    pub fn parse(&self, name: &str) -> Result<AccessLevel> {
        let level = AccessLevel::from_name(name)?;
        if self.allowed().contains(&level) {
            Ok(level)
        } else {
            Err(Error::AccessLevelNotAllowed {
                name: name.to_string(),
                family: self.to_string(),
                allowed: self
                    .allowed()
                    .iter()
                    .map(|l| l.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    }
}

impl fmt::Display for AccessFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessFamily::ProtectedEnvironmentDeploy => write!(f, "protected environment deploy"),
            AccessFamily::ProjectMember => write!(f, "project member"),
            AccessFamily::GroupMember => write!(f, "group member"),
            AccessFamily::TagProtection => write!(f, "tag protection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_names_round_trip() {
        for level in AccessLevel::ALL {
            let value = name_to_value(level.name()).unwrap();
            assert_eq!(value_to_name(value).unwrap(), level.name());
        }
    }

    #[test]
    fn master_alias_maps_to_maintainer() {
        let value = name_to_value("master").unwrap();
        assert_eq!(value, 40);
        let canonical = value_to_name(value).unwrap();
        assert_eq!(canonical, "maintainer");
        assert_ne!(canonical, DEPRECATED_MAINTAINER_ALIAS);
    }

    #[test]
    fn levels_are_ordered_by_privilege() {
        assert!(AccessLevel::NoOne < AccessLevel::Minimal);
        assert!(AccessLevel::Developer < AccessLevel::Maintainer);
        assert!(AccessLevel::Owner < AccessLevel::Admin);
    }

    #[test]
    fn serde_uses_canonical_names_and_accepts_alias() {
        let json = serde_json::to_string(&AccessLevel::NoOne).unwrap();
        assert_eq!(json, "\"no one\"");

        let level: AccessLevel = serde_json::from_str("\"master\"").unwrap();
        assert_eq!(level, AccessLevel::Maintainer);
        assert_eq!(serde_json::to_string(&level).unwrap(), "\"maintainer\"");
    }

    #[test]
    fn unknown_names_and_values_fail() {
        assert!(matches!(
            AccessLevel::from_name("Maintainer"),
            Err(Error::UnknownAccessLevel { .. })
        ));
        assert!(matches!(
            AccessLevel::from_value(35),
            Err(Error::UnknownAccessValue { value: 35 })
        ));
    }

    #[test]
    fn family_restricts_levels() {
        let family = AccessFamily::ProtectedEnvironmentDeploy;
        assert_eq!(family.parse("developer").unwrap(), AccessLevel::Developer);
        assert_eq!(family.parse("master").unwrap(), AccessLevel::Maintainer);

        let err = family.parse("guest").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("developer, maintainer"), "got: {msg}");
    }
}
