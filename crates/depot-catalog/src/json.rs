//! JSON-file catalog.
//!
//! The whole catalog is one JSON document, loaded into memory at open and
//! rewritten after every mutation via temp file + rename, so a crash leaves
//! either the previous or the new document on disk, never a torn one.
//!
//! The document carries a schema version that is checked exactly once, at
//! open. An unknown version fails fast instead of being rechecked per call.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use depot_types::{CollectionId, Version};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::record::{ArtifactKey, ArtifactRecord, ReleaseRecord, UpsertOutcome};
use crate::state::CatalogState;
use crate::traits::{ArtifactCatalog, ReleaseCatalog};

/// Schema version written to, and required of, the catalog document.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CatalogDocument {
    schema_version: u32,
    #[serde(default)]
    artifacts: Vec<ArtifactRecord>,
    #[serde(default)]
    releases: Vec<ReleaseRecord>,
}

/// Just enough of the document to check compatibility before a full parse.
#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: Option<u32>,
}

/// Catalog persisted as a single JSON document.
///
/// Mutations are applied to a copy of the state, flushed, and only then
/// published, so a failed flush leaves both disk and memory unchanged.
#[derive(Debug)]
pub struct JsonFileCatalog {
    path: PathBuf,
    state: RwLock<CatalogState>,
}

impl JsonFileCatalog {
    /// Load the catalog at `path`, or start an empty one if the file does
    /// not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => Self::decode(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "creating new catalog");
                let state = CatalogState::default();
                Self::flush(&path, &state)?;
                state
            }
            Err(e) => {
                return Err(CatalogError::Io {
                    context: format!("reading {}", path.display()),
                    source: e,
                })
            }
        };
        debug!(
            path = %path.display(),
            artifacts = state.artifacts.len(),
            releases = state.releases.len(),
            "catalog loaded"
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(bytes: &[u8]) -> CatalogResult<CatalogState> {
        let header: SchemaHeader =
            serde_json::from_slice(bytes).map_err(|e| CatalogError::Serialization(e.to_string()))?;
        let found = header.schema_version.unwrap_or(0);
        if found != SCHEMA_VERSION {
            return Err(CatalogError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }

        let doc: CatalogDocument =
            serde_json::from_slice(bytes).map_err(|e| CatalogError::Serialization(e.to_string()))?;
        let mut state = CatalogState::default();
        for record in doc.artifacts {
            state.upsert_artifact(record);
        }
        for record in doc.releases {
            state.insert_release(record)?;
        }
        Ok(state)
    }

    fn flush(path: &Path, state: &CatalogState) -> CatalogResult<()> {
        let doc = CatalogDocument {
            schema_version: SCHEMA_VERSION,
            artifacts: state.artifacts.values().cloned().collect(),
            releases: state.releases.clone(),
        };
        let bytes =
            serde_json::to_vec_pretty(&doc).map_err(|e| CatalogError::Serialization(e.to_string()))?;

        let io_err = |source: io::Error| CatalogError::Io {
            context: format!("writing {}", path.display()),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_err)?;
        let mut temp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        temp.write_all(&bytes).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogState) -> T) -> CatalogResult<T> {
        let state = self.state.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(f(&state))
    }

    /// Apply `f` to a copy of the state, flush the copy, then publish it.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut CatalogState) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        let mut next = state.clone();
        let out = f(&mut next)?;
        Self::flush(&self.path, &next)?;
        *state = next;
        Ok(out)
    }
}

impl ArtifactCatalog for JsonFileCatalog {
    fn get_artifact(&self, key: &ArtifactKey) -> CatalogResult<Option<ArtifactRecord>> {
        self.read(|s| s.get_artifact(key))
    }

    fn upsert_artifact(&self, record: ArtifactRecord) -> CatalogResult<UpsertOutcome> {
        self.mutate(|s| Ok(s.upsert_artifact(record)))
    }

    fn list_artifacts(&self, collection: &CollectionId) -> CatalogResult<Vec<ArtifactRecord>> {
        self.read(|s| s.list_artifacts(collection))
    }

    fn collections(&self) -> CatalogResult<Vec<CollectionId>> {
        self.read(|s| s.collections())
    }
}

impl ReleaseCatalog for JsonFileCatalog {
    fn get_release(&self, version: &Version) -> CatalogResult<Option<ReleaseRecord>> {
        self.read(|s| s.get_release(version))
    }

    fn insert_release(&self, record: ReleaseRecord) -> CatalogResult<()> {
        self.mutate(|s| s.insert_release(record))
    }

    fn latest_release(&self) -> CatalogResult<Option<ReleaseRecord>> {
        self.read(|s| s.latest_release())
    }

    fn set_release_notes(&self, version: &Version, notes: Option<String>) -> CatalogResult<bool> {
        // No row affected means nothing to flush.
        if self.read(|s| s.get_release(version).is_none())? {
            return Ok(false);
        }
        self.mutate(|s| Ok(s.set_release_notes(version, notes)))
    }

    fn list_releases(&self) -> CatalogResult<Vec<ReleaseRecord>> {
        self.read(|s| s.list_releases())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{artifact, release};

    fn v(s: &str) -> Version {
        Version::new(s).unwrap()
    }

    #[test]
    fn open_missing_creates_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/catalog.json");
        let catalog = JsonFileCatalog::open(&path).unwrap();
        assert!(path.is_file());
        assert!(catalog.latest_release().unwrap().is_none());

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        {
            let catalog = JsonFileCatalog::open(&path).unwrap();
            catalog.upsert_artifact(artifact("g", "a/b.pak", 3)).unwrap();
            catalog.insert_release(release("1.0.0", 1)).unwrap();
            catalog.insert_release(release("1.1.0", 2)).unwrap();
            catalog
                .set_release_notes(&v("1.0.0"), Some("first".into()))
                .unwrap();
        }

        let catalog = JsonFileCatalog::open(&path).unwrap();
        let rec = catalog.get_artifact(&artifact("g", "a/b.pak", 3).key()).unwrap().unwrap();
        assert_eq!(rec, artifact("g", "a/b.pak", 3));
        assert_eq!(catalog.latest_release().unwrap().unwrap().version, v("1.1.0"));
        assert_eq!(
            catalog.get_release(&v("1.0.0")).unwrap().unwrap().release_notes.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn conflict_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let catalog = JsonFileCatalog::open(&path).unwrap();
        catalog.insert_release(release("1.0.0", 1)).unwrap();
        let before = fs::read(&path).unwrap();

        assert!(matches!(
            catalog.insert_release(release("1.0.0", 5)),
            Err(CatalogError::Conflict { .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn schema_mismatch_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, br#"{"schema_version": 99, "artifacts": []}"#).unwrap();
        let err = JsonFileCatalog::open(&path).unwrap_err();
        assert!(matches!(err, CatalogError::SchemaMismatch { expected: 1, found: 99 }));
    }

    #[test]
    fn missing_schema_marker_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, br#"{"artifacts": []}"#).unwrap();
        assert!(matches!(
            JsonFileCatalog::open(&path),
            Err(CatalogError::SchemaMismatch { found: 0, .. })
        ));
    }

    #[test]
    fn corrupt_document_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonFileCatalog::open(&path),
            Err(CatalogError::Serialization(_))
        ));
    }
}
