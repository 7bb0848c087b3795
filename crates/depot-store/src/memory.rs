use std::collections::{BTreeMap, HashMap};
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use depot_crypto::HashingReader;

use crate::error::{StoreError, StoreResult};
use crate::location::{archive_stamp, stamp_candidates, ArchivedBlob, BlobLocation};
use crate::traits::{BlobStore, StagedBlob, StagedContent};

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Live blobs and archived blobs are held
/// in separate maps behind `RwLock`s. Paths reported by
/// [`resolve_path`](BlobStore::resolve_path) use the same layout as
/// [`FsBlobStore`](crate::FsBlobStore) under a virtual root.
///
/// Commits can be made to fail on demand to exercise rollback paths in
/// callers.
pub struct InMemoryBlobStore {
    root: PathBuf,
    live: RwLock<HashMap<BlobLocation, Vec<u8>>>,
    archived: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    fail_commits: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/memory"),
            live: RwLock::new(HashMap::new()),
            archived: RwLock::new(BTreeMap::new()),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `commit` fail with an I/O error (or stop doing so).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of live blobs.
    pub fn len(&self) -> usize {
        self.live.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of every archived blob, sorted.
    pub fn archived_paths(&self) -> StoreResult<Vec<PathBuf>> {
        let archived = self.archived.read().map_err(|_| StoreError::Poisoned)?;
        Ok(archived.keys().cloned().collect())
    }

    /// Contents of an archived blob, if one exists at `path`.
    pub fn read_archived(&self, path: &std::path::Path) -> StoreResult<Option<Vec<u8>>> {
        let archived = self.archived.read().map_err(|_| StoreError::Poisoned)?;
        Ok(archived.get(path).cloned())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn stage(&self, reader: &mut dyn Read) -> StoreResult<StagedBlob> {
        let mut hashing = HashingReader::new(reader);
        let mut buf = Vec::new();
        hashing
            .read_to_end(&mut buf)
            .map_err(|e| StoreError::io("receiving upload into staging", e))?;
        let (hash, size) = hashing.finish();
        Ok(StagedBlob::new(hash, size, StagedContent::Buffer(buf)))
    }

    fn commit(&self, staged: StagedBlob, location: &BlobLocation) -> StoreResult<u64> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                format!("committing {location}"),
                io::Error::new(io::ErrorKind::Other, "injected commit failure"),
            ));
        }
        let size = staged.size();
        let bytes = match staged.content {
            StagedContent::Buffer(bytes) => bytes,
            StagedContent::File(temp) => std::fs::read(temp.path())
                .map_err(|e| StoreError::io("reading staging file", e))?,
        };
        let mut live = self.live.write().map_err(|_| StoreError::Poisoned)?;
        live.insert(location.clone(), bytes);
        Ok(size)
    }

    fn exists(&self, location: &BlobLocation) -> StoreResult<bool> {
        let live = self.live.read().map_err(|_| StoreError::Poisoned)?;
        Ok(live.contains_key(location))
    }

    fn read(&self, location: &BlobLocation) -> StoreResult<Box<dyn Read + Send>> {
        let live = self.live.read().map_err(|_| StoreError::Poisoned)?;
        let bytes = live
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(location.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn archive(&self, location: &BlobLocation, at: DateTime<Utc>) -> StoreResult<ArchivedBlob> {
        let mut live = self.live.write().map_err(|_| StoreError::Poisoned)?;
        let mut archived = self.archived.write().map_err(|_| StoreError::Poisoned)?;

        let base = archive_stamp(at);
        let (stamp, path) = stamp_candidates(&base)
            .map(|stamp| {
                let path = location.archive_path(&self.root, &stamp);
                (stamp, path)
            })
            .find(|(_, path)| !archived.contains_key(path))
            .ok_or_else(|| StoreError::NotFound(location.to_string()))?;

        let bytes = live
            .remove(location)
            .ok_or_else(|| StoreError::NotFound(location.to_string()))?;
        archived.insert(path.clone(), bytes);
        Ok(ArchivedBlob {
            origin: location.clone(),
            stamp,
            path,
        })
    }

    fn restore(&self, archived_blob: &ArchivedBlob) -> StoreResult<()> {
        let mut live = self.live.write().map_err(|_| StoreError::Poisoned)?;
        let mut archived = self.archived.write().map_err(|_| StoreError::Poisoned)?;
        let bytes = archived
            .remove(&archived_blob.path)
            .ok_or_else(|| StoreError::NotFound(archived_blob.path.display().to_string()))?;
        live.insert(archived_blob.origin.clone(), bytes);
        Ok(())
    }

    fn remove(&self, location: &BlobLocation) -> StoreResult<bool> {
        let mut live = self.live.write().map_err(|_| StoreError::Poisoned)?;
        Ok(live.remove(location).is_some())
    }

    fn resolve_path(&self, location: &BlobLocation) -> PathBuf {
        location.live_path(&self.root)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
