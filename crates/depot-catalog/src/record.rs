//! Catalog record types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use depot_types::{CollectionId, ContentHash, RelativePath, Version};
use serde::{Deserialize, Serialize};

/// Natural key of an artifact: unique per catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub collection: CollectionId,
    pub path: RelativePath,
}

impl ArtifactKey {
    pub fn new(collection: CollectionId, path: RelativePath) -> Self {
        Self { collection, path }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.path)
    }
}

/// Catalog entry for a mutable game file.
///
/// For a given key, `hash` always matches the bytes currently stored at
/// `storage_path`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub collection: CollectionId,
    pub path: RelativePath,
    /// Display name: the final component of `path`.
    pub name: String,
    pub size: u64,
    pub hash: ContentHash,
    /// Server time of the ingestion that stored the current content.
    pub uploaded_at: DateTime<Utc>,
    /// Modification time the uploader reported for the source file.
    pub modified_at: DateTime<Utc>,
    pub storage_path: PathBuf,
}

impl ArtifactRecord {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.collection.clone(), self.path.clone())
    }
}

/// Catalog entry for an immutable client build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub version: Version,
    /// File name of the uploaded binary.
    pub name: String,
    pub size: u64,
    pub hash: ContentHash,
    pub uploaded_at: DateTime<Utc>,
    pub storage_path: PathBuf,
    #[serde(default)]
    pub release_notes: Option<String>,
}

/// Result of an artifact upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
