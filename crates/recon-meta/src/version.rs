//! Capability descriptors
//!
//! The connected remote system reports a free-form version string such as
//! `16.4.1-ee`. Only the first two dot-separated segments are significant.
//! The major segment must be numeric; the minor segment must start with a
//! digit, and anything after its leading digits (`15.4-pre`) is ignored, as
//! are patch levels and build suffixes.
//!
//! # Examples
//!
//! ```
//! use recon_meta::version::{at_least, less_than};
//!
//! assert!(at_least("15.4.2-ee", "15.4").unwrap());
//! assert!(at_least("16.0", "15.11").unwrap());
//! assert!(less_than("14.10", "15.0").unwrap());
//! assert!(at_least("15.4-rc1", "15.4").unwrap());
//! assert!(at_least("15", "15.0").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A `(major, minor)` pair extracted from a version string.
///
/// Ordering is derived: `major` dominates and `minor` only breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityDescriptor {
    pub major: u64,
    pub minor: u64,
}

impl CapabilityDescriptor {
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// Parse a version string, keeping only major and minor.
    pub fn parse(version: &str) -> Result<Self> {
        let mut segments = version.split('.');
        let major = parse_segment(version, segments.next(), "major", false)?;
        let minor = parse_segment(version, segments.next(), "minor", true)?;
        Ok(Self { major, minor })
    }

    /// Whether `self` satisfies a minimum of `wanted`.
    pub fn at_least(&self, wanted: &CapabilityDescriptor) -> bool {
        if self.major != wanted.major {
            return self.major > wanted.major;
        }
        self.minor >= wanted.minor
    }
}

/// Parse one segment. With `prefix`, only the leading digits count.
fn parse_segment(version: &str, segment: Option<&str>, name: &str, prefix: bool) -> Result<u64> {
    let segment = segment.ok_or_else(|| Error::VersionParse {
        version: version.to_string(),
        reason: format!("missing {name} segment"),
    })?;
    let digits = segment.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || (!prefix && digits != segment.len()) {
        return Err(Error::VersionParse {
            version: version.to_string(),
            reason: format!("{name} segment {segment:?} is not numeric"),
        });
    }
    segment[..digits].parse().map_err(|_| Error::VersionParse {
        version: version.to_string(),
        reason: format!("{name} segment {segment:?} is out of range"),
    })
}

impl FromStr for CapabilityDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Whether version `current` is at least `wanted`.
pub fn at_least(current: &str, wanted: &str) -> Result<bool> {
    let current = CapabilityDescriptor::parse(current)?;
    let wanted = CapabilityDescriptor::parse(wanted)?;
    Ok(current.at_least(&wanted))
}

/// Negation of [`at_least`].
pub fn less_than(current: &str, wanted: &str) -> Result<bool> {
    at_least(current, wanted).map(|ok| !ok)
}
