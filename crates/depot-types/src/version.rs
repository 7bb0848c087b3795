use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::RESERVED_COLLECTION;

const MAX_VERSION_LEN: usize = 64;

/// Client release version string.
///
/// Versions are opaque identifiers: uniqueness is by exact string match. A
/// version doubles as a storage directory name, so it is restricted to
/// `[A-Za-z0-9._+-]`, must not start with `.`, and must not collide with the
/// archive directory name.
///
/// [`Version::compare_numeric`] offers an ordering for dotted-numeric
/// versions (`1.2.0`, `v2.10`) when the caller wants one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        let invalid = |reason: &str| TypeError::InvalidVersion {
            value: value.clone(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.len() > MAX_VERSION_LEN {
            return Err(invalid("too long"));
        }
        if value.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        if value.eq_ignore_ascii_case(RESERVED_COLLECTION) {
            return Err(invalid("reserved for archived content"));
        }
        if let Some(ch) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')))
        {
            return Err(invalid(&format!("contains forbidden character: {ch:?}")));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric components of a dotted version, ignoring a leading `v`.
    ///
    /// Returns `None` unless every component is a plain unsigned integer,
    /// so `1.2.0-beta` and `2024a` do not parse.
    pub fn numeric_components(&self) -> Option<Vec<u64>> {
        let trimmed = self
            .0
            .strip_prefix('v')
            .or_else(|| self.0.strip_prefix('V'))
            .unwrap_or(&self.0);
        trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    part.parse::<u64>().ok()
                }
            })
            .collect()
    }

    /// Compare two dotted-numeric versions component by component.
    ///
    /// Missing trailing components count as zero (`1.2` == `1.2.0`).
    /// Returns `None` if either side is not dotted-numeric.
    pub fn compare_numeric(&self, other: &Self) -> Option<Ordering> {
        let a = self.numeric_components()?;
        let b = other.numeric_components()?;
        let len = a.len().max(b.len());
        for i in 0..len {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            match x.cmp(&y) {
                Ordering::Equal => continue,
                unequal => return Some(unequal),
            }
        }
        Some(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Version {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.0
    }
}
