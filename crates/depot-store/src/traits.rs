use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use depot_crypto::hash_reader;
use depot_types::ContentHash;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::location::{ArchivedBlob, BlobLocation};

/// Content that has been fully received and hashed but is not yet visible at
/// any live location.
///
/// Dropping a `StagedBlob` without committing it discards the content.
#[derive(Debug)]
pub struct StagedBlob {
    hash: ContentHash,
    size: u64,
    pub(crate) content: StagedContent,
}

#[derive(Debug)]
pub(crate) enum StagedContent {
    File(NamedTempFile),
    Buffer(Vec<u8>),
}

impl StagedBlob {
    pub(crate) fn new(hash: ContentHash, size: u64, content: StagedContent) -> Self {
        Self { hash, size, content }
    }

    /// Digest of exactly the bytes that were staged.
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Durable hierarchical file storage.
///
/// All implementations must satisfy these invariants:
/// - A live location holds either nothing or a complete file. Partially
///   received uploads are only ever visible in staging.
/// - `archive` moves, never copies: afterwards the live location is empty.
/// - All I/O errors are propagated with the location that failed.
pub trait BlobStore: Send + Sync {
    /// Copy `reader` into staging, hashing it in the same pass.
    fn stage(&self, reader: &mut dyn Read) -> StoreResult<StagedBlob>;

    /// Atomically move staged content to `location`, replacing whatever is
    /// there. Missing parent directories are created. Returns the stored size.
    fn commit(&self, staged: StagedBlob, location: &BlobLocation) -> StoreResult<u64>;

    /// Check whether a live blob exists at `location`.
    fn exists(&self, location: &BlobLocation) -> StoreResult<bool>;

    /// Open the live blob at `location` for reading.
    fn read(&self, location: &BlobLocation) -> StoreResult<Box<dyn Read + Send>>;

    /// Move the live blob at `location` into the archive namespace under the
    /// timestamp `at`. Fails with [`StoreError::NotFound`] if there is no
    /// live blob.
    fn archive(&self, location: &BlobLocation, at: DateTime<Utc>) -> StoreResult<ArchivedBlob>;

    /// Move an archived blob back to the live location it came from.
    fn restore(&self, archived: &ArchivedBlob) -> StoreResult<()>;

    /// Delete the live blob at `location`. Returns `true` if it existed.
    fn remove(&self, location: &BlobLocation) -> StoreResult<bool>;

    /// Absolute path the blob at `location` is (or would be) stored under.
    fn resolve_path(&self, location: &BlobLocation) -> PathBuf;

    /// Stage and commit in one step. Returns the digest and stored size.
    fn write(&self, location: &BlobLocation, reader: &mut dyn Read) -> StoreResult<(ContentHash, u64)> {
        let staged = self.stage(reader)?;
        let hash = staged.hash();
        let size = self.commit(staged, location)?;
        Ok((hash, size))
    }

    /// Digest of the live blob currently stored at `location`.
    fn digest(&self, location: &BlobLocation) -> StoreResult<ContentHash> {
        let reader = self.read(location)?;
        let (hash, _) = hash_reader(reader)
            .map_err(|e| StoreError::io(format!("hashing {location}"), e))?;
        Ok(hash)
    }
}
