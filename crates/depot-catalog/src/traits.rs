//! Catalog storage traits.
//!
//! Any backend (in-memory, JSON file, database) implements these traits.
//! Every mutating method is a single atomic operation from the caller's
//! point of view: backends must not expose a state where a lookup and the
//! following write can interleave with another writer.

use depot_types::{CollectionId, Version};

use crate::error::CatalogResult;
use crate::record::{ArtifactKey, ArtifactRecord, ReleaseRecord, UpsertOutcome};

/// Storage for artifact records, keyed by `(collection, path)`.
pub trait ArtifactCatalog: Send + Sync {
    /// Point lookup. Returns `Ok(None)` if the key is unknown.
    fn get_artifact(&self, key: &ArtifactKey) -> CatalogResult<Option<ArtifactRecord>>;

    /// Insert the record, or replace the existing record with the same key.
    fn upsert_artifact(&self, record: ArtifactRecord) -> CatalogResult<UpsertOutcome>;

    /// All records in `collection`, sorted by path.
    fn list_artifacts(&self, collection: &CollectionId) -> CatalogResult<Vec<ArtifactRecord>>;

    /// Every collection that has at least one record, sorted.
    fn collections(&self) -> CatalogResult<Vec<CollectionId>>;
}

/// Storage for release records, keyed by version.
pub trait ReleaseCatalog: Send + Sync {
    /// Point lookup. Returns `Ok(None)` if the version is unknown.
    fn get_release(&self, version: &Version) -> CatalogResult<Option<ReleaseRecord>>;

    /// Insert a new release. Fails with
    /// [`CatalogError::Conflict`](crate::CatalogError::Conflict) if the
    /// version exists; the existing record is left untouched.
    fn insert_release(&self, record: ReleaseRecord) -> CatalogResult<()>;

    /// The release with the latest upload timestamp. On equal timestamps the
    /// later insertion wins.
    fn latest_release(&self) -> CatalogResult<Option<ReleaseRecord>>;

    /// Replace the release notes of an existing release.
    ///
    /// Returns `Ok(false)` if no release has this version (no row affected).
    fn set_release_notes(&self, version: &Version, notes: Option<String>) -> CatalogResult<bool>;

    /// All releases, newest first.
    fn list_releases(&self) -> CatalogResult<Vec<ReleaseRecord>>;
}
