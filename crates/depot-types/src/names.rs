//! Collection id and relative path validation.
//!
//! Both types end up as components of on-disk storage paths, so they are
//! validated at construction:
//!
//! - Collection ids are a single path component of `[A-Za-z0-9._-]`, must not
//!   start with `.` and must not be the reserved archive directory name.
//! - Relative paths use `/` as separator (`\` is normalized to `/`), must not
//!   be absolute, and every component must be non-empty and must not be `.`
//!   or `..`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Directory name used for the archive namespace inside each storage area.
/// No collection may take this name.
pub const RESERVED_COLLECTION: &str = "deprecated";

const MAX_COLLECTION_LEN: usize = 128;
const MAX_PATH_LEN: usize = 1024;

/// Characters that are forbidden anywhere in a relative path.
const FORBIDDEN_PATH_CHARS: &[char] = &['\0', '\n', '\r', ':', '*', '?', '"', '<', '>', '|'];

/// Namespace of related artifacts, e.g. one game's full file set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(String);

impl CollectionId {
    /// Validate and wrap a collection id.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        let invalid = |reason: &str| TypeError::InvalidCollection {
            value: value.clone(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.len() > MAX_COLLECTION_LEN {
            return Err(invalid("too long"));
        }
        if value.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        if value.eq_ignore_ascii_case(RESERVED_COLLECTION) {
            return Err(invalid("name is reserved for the archive namespace"));
        }
        if let Some(ch) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(invalid(&format!("contains forbidden character: {ch:?}")));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CollectionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.0
    }
}

/// Normalized relative path of an artifact inside its collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Normalize and validate a relative path.
    ///
    /// Backslashes are converted to `/` so uploads from Windows build
    /// machines land at the same key as uploads from anywhere else.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let original = value.into();
        let normalized = original.replace('\\', "/");
        let invalid = |reason: &str| TypeError::InvalidPath {
            value: original.clone(),
            reason: reason.to_string(),
        };

        if normalized.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if normalized.len() > MAX_PATH_LEN {
            return Err(invalid("too long"));
        }
        if normalized.starts_with('/') {
            return Err(invalid("must be relative"));
        }
        if let Some(ch) = normalized.chars().find(|c| FORBIDDEN_PATH_CHARS.contains(c)) {
            return Err(invalid(&format!("contains forbidden character: {ch:?}")));
        }
        for component in normalized.split('/') {
            match component {
                "" => return Err(invalid("path components must not be empty")),
                "." | ".." => return Err(invalid("must not contain '.' or '..' components")),
                _ => {}
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final component, used as the artifact's display name.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Iterate over the `/`-separated components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_collections() {
        for name in ["game-1", "Space_Race", "v2.assets", "a"] {
            assert!(CollectionId::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_collections() {
        for name in ["", ".hidden", "deprecated", "DEPRECATED", "a/b", "a b", "..", "x\\y"] {
            assert!(CollectionId::new(name).is_err(), "{name:?} should be invalid");
        }
    }

    #[test]
    fn collection_too_long() {
        let name = "a".repeat(MAX_COLLECTION_LEN + 1);
        assert!(CollectionId::new(name).is_err());
    }

    #[test]
    fn backslashes_are_normalized() {
        let p = RelativePath::new("data\\maps\\level1.pak").unwrap();
        assert_eq!(p.as_str(), "data/maps/level1.pak");
        assert_eq!(p.file_name(), "level1.pak");
        assert_eq!(p.components().count(), 3);
    }

    #[test]
    fn traversal_is_rejected() {
        for path in ["../etc/passwd", "a/../b", "./a", "a/./b", "/abs", "a//b", "a/", ""] {
            assert!(RelativePath::new(path).is_err(), "{path:?} should be invalid");
        }
    }

    #[test]
    fn drive_letters_are_rejected() {
        assert!(RelativePath::new("C:\\Windows\\system.ini").is_err());
    }

    #[test]
    fn dotfiles_are_allowed() {
        let p = RelativePath::new("config/.settings").unwrap();
        assert_eq!(p.file_name(), ".settings");
    }

    #[test]
    fn serde_validates() {
        let ok: RelativePath = serde_json::from_str("\"a/b.txt\"").unwrap();
        assert_eq!(ok.as_str(), "a/b.txt");
        assert!(serde_json::from_str::<RelativePath>("\"../x\"").is_err());
        assert!(serde_json::from_str::<CollectionId>("\"deprecated\"").is_err());
    }
}
