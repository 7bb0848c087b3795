//! Table state shared by the catalog backends.

use std::collections::BTreeMap;

use depot_types::{CollectionId, Version};

use crate::error::{CatalogError, CatalogResult};
use crate::record::{ArtifactKey, ArtifactRecord, ReleaseRecord, UpsertOutcome};

/// Both catalog tables. Releases are kept in insertion order so that
/// "latest" can break timestamp ties by insertion.
#[derive(Clone, Debug, Default)]
pub(crate) struct CatalogState {
    pub(crate) artifacts: BTreeMap<ArtifactKey, ArtifactRecord>,
    pub(crate) releases: Vec<ReleaseRecord>,
}

impl CatalogState {
    pub(crate) fn get_artifact(&self, key: &ArtifactKey) -> Option<ArtifactRecord> {
        self.artifacts.get(key).cloned()
    }

    pub(crate) fn upsert_artifact(&mut self, record: ArtifactRecord) -> UpsertOutcome {
        match self.artifacts.insert(record.key(), record) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        }
    }

    pub(crate) fn list_artifacts(&self, collection: &CollectionId) -> Vec<ArtifactRecord> {
        // BTreeMap order is (collection, path), so the slice for one
        // collection is contiguous and already sorted by path.
        self.artifacts
            .iter()
            .filter(|(k, _)| &k.collection == collection)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub(crate) fn collections(&self) -> Vec<CollectionId> {
        let mut out: Vec<CollectionId> = self.artifacts.keys().map(|k| k.collection.clone()).collect();
        out.dedup();
        out
    }

    pub(crate) fn get_release(&self, version: &Version) -> Option<ReleaseRecord> {
        self.releases.iter().find(|r| &r.version == version).cloned()
    }

    pub(crate) fn insert_release(&mut self, record: ReleaseRecord) -> CatalogResult<()> {
        if self.releases.iter().any(|r| r.version == record.version) {
            return Err(CatalogError::Conflict {
                version: record.version.to_string(),
            });
        }
        self.releases.push(record);
        Ok(())
    }

    pub(crate) fn latest_release(&self) -> Option<ReleaseRecord> {
        // max_by_key keeps the last of equal maxima: later insertion wins.
        self.releases.iter().max_by_key(|r| r.uploaded_at).cloned()
    }

    pub(crate) fn set_release_notes(&mut self, version: &Version, notes: Option<String>) -> bool {
        match self.releases.iter_mut().find(|r| &r.version == version) {
            Some(record) => {
                record.release_notes = notes;
                true
            }
            None => false,
        }
    }

    pub(crate) fn list_releases(&self) -> Vec<ReleaseRecord> {
        let mut out: Vec<(usize, ReleaseRecord)> = self.releases.iter().cloned().enumerate().collect();
        out.sort_by(|(ia, a), (ib, b)| b.uploaded_at.cmp(&a.uploaded_at).then(ib.cmp(ia)));
        out.into_iter().map(|(_, r)| r).collect()
    }
}
