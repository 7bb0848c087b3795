//! In-memory catalog for testing and ephemeral use.
//!
//! [`InMemoryCatalog`] keeps both tables behind a single `RwLock`. Every
//! trait method takes the lock once, so upserts and insert-if-absent checks
//! are atomic.

use std::sync::RwLock;

use depot_types::{CollectionId, Version};

use crate::error::{CatalogError, CatalogResult};
use crate::record::{ArtifactKey, ArtifactRecord, ReleaseRecord, UpsertOutcome};
use crate::state::CatalogState;
use crate::traits::{ArtifactCatalog, ReleaseCatalog};

/// An in-memory implementation of both catalog traits. Data is lost when
/// the catalog is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogState) -> T) -> CatalogResult<T> {
        let state = self.state.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut CatalogState) -> T) -> CatalogResult<T> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        Ok(f(&mut state))
    }
}

impl ArtifactCatalog for InMemoryCatalog {
    fn get_artifact(&self, key: &ArtifactKey) -> CatalogResult<Option<ArtifactRecord>> {
        self.read(|s| s.get_artifact(key))
    }

    fn upsert_artifact(&self, record: ArtifactRecord) -> CatalogResult<UpsertOutcome> {
        self.write(|s| s.upsert_artifact(record))
    }

    fn list_artifacts(&self, collection: &CollectionId) -> CatalogResult<Vec<ArtifactRecord>> {
        self.read(|s| s.list_artifacts(collection))
    }

    fn collections(&self) -> CatalogResult<Vec<CollectionId>> {
        self.read(|s| s.collections())
    }
}

impl ReleaseCatalog for InMemoryCatalog {
    fn get_release(&self, version: &Version) -> CatalogResult<Option<ReleaseRecord>> {
        self.read(|s| s.get_release(version))
    }

    fn insert_release(&self, record: ReleaseRecord) -> CatalogResult<()> {
        self.write(|s| s.insert_release(record))?
    }

    fn latest_release(&self) -> CatalogResult<Option<ReleaseRecord>> {
        self.read(|s| s.latest_release())
    }

    fn set_release_notes(&self, version: &Version, notes: Option<String>) -> CatalogResult<bool> {
        self.write(|s| s.set_release_notes(version, notes))
    }

    fn list_releases(&self) -> CatalogResult<Vec<ReleaseRecord>> {
        self.read(|s| s.list_releases())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{artifact, at, release};
    use depot_types::ContentHash;

    fn v(s: &str) -> Version {
        Version::new(s).unwrap()
    }

    // ---- Artifacts ----

    #[test]
    fn upsert_inserts_then_updates() {
        let catalog = InMemoryCatalog::new();
        let rec = artifact("g", "a/b.pak", 1);
        assert_eq!(catalog.upsert_artifact(rec.clone()).unwrap(), UpsertOutcome::Inserted);

        let mut changed = rec.clone();
        changed.hash = ContentHash::from_digest([9; 32]);
        changed.uploaded_at = at(30);
        assert_eq!(catalog.upsert_artifact(changed.clone()).unwrap(), UpsertOutcome::Updated);

        let stored = catalog.get_artifact(&rec.key()).unwrap().unwrap();
        assert_eq!(stored, changed);
    }

    #[test]
    fn unknown_artifact_is_none() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.get_artifact(&artifact("g", "x", 0).key()).unwrap().is_none());
    }

    #[test]
    fn list_is_scoped_and_sorted() {
        let catalog = InMemoryCatalog::new();
        for (c, p) in [("g2", "z"), ("g1", "b"), ("g1", "a/c"), ("g1", "a")] {
            catalog.upsert_artifact(artifact(c, p, 0)).unwrap();
        }
        let g1 = CollectionId::new("g1").unwrap();
        let paths: Vec<String> = catalog
            .list_artifacts(&g1)
            .unwrap()
            .into_iter()
            .map(|r| r.path.to_string())
            .collect();
        assert_eq!(paths, vec!["a", "a/c", "b"]);

        let names: Vec<String> = catalog.collections().unwrap().into_iter().map(String::from).collect();
        assert_eq!(names, vec!["g1", "g2"]);
    }

    // ---- Releases ----

    #[test]
    fn duplicate_release_conflicts_and_keeps_original() {
        let catalog = InMemoryCatalog::new();
        let original = release("1.0.0", 1);
        catalog.insert_release(original.clone()).unwrap();

        let mut other = release("1.0.0", 2);
        other.hash = ContentHash::from_digest([0xEE; 32]);
        let err = catalog.insert_release(other).unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { ref version } if version == "1.0.0"));

        assert_eq!(catalog.get_release(&v("1.0.0")).unwrap().unwrap(), original);
    }

    #[test]
    fn latest_is_by_upload_time() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.latest_release().unwrap().is_none());

        catalog.insert_release(release("2.0.0", 10)).unwrap();
        catalog.insert_release(release("1.5.0", 20)).unwrap();
        catalog.insert_release(release("1.0.0", 5)).unwrap();

        // Upload order, not version order.
        assert_eq!(catalog.latest_release().unwrap().unwrap().version, v("1.5.0"));
    }

    #[test]
    fn latest_tie_goes_to_later_insert() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_release(release("a", 10)).unwrap();
        catalog.insert_release(release("b", 10)).unwrap();
        assert_eq!(catalog.latest_release().unwrap().unwrap().version, v("b"));

        let listed: Vec<String> = catalog
            .list_releases()
            .unwrap()
            .into_iter()
            .map(|r| r.version.to_string())
            .collect();
        assert_eq!(listed, vec!["b", "a"]);
    }

    #[test]
    fn release_notes_update_existing_only() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_release(release("1.0.0", 1)).unwrap();

        assert!(catalog.set_release_notes(&v("1.0.0"), Some("Fixes".into())).unwrap());
        assert!(!catalog.set_release_notes(&v("9.9.9"), Some("nope".into())).unwrap());

        let rec = catalog.get_release(&v("1.0.0")).unwrap().unwrap();
        assert_eq!(rec.release_notes.as_deref(), Some("Fixes"));
        assert!(catalog.get_release(&v("9.9.9")).unwrap().is_none());
    }
}
