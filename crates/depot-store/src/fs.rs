use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use depot_crypto::HashingReader;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::location::{archive_stamp, stamp_candidates, ArchivedBlob, BlobLocation};
use crate::traits::{BlobStore, StagedBlob, StagedContent};

/// Staging directory name under the store root.
const STAGING_DIR: &str = ".staging";

/// Filesystem-backed blob store.
///
/// Staging files live under `{root}/.staging` so that committing is a
/// same-filesystem rename.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    staging: PathBuf,
}

impl FsBlobStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging)
            .map_err(|e| StoreError::io(format!("creating {}", staging.display()), e))?;
        Ok(Self { root, staging })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn new_temp(&self) -> StoreResult<NamedTempFile> {
        NamedTempFile::new_in(&self.staging)
            .map_err(|e| StoreError::io("creating staging file", e))
    }

    fn ensure_parent(path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io(format!("creating {}", parent.display()), e))?;
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    fn stage(&self, reader: &mut dyn Read) -> StoreResult<StagedBlob> {
        let mut temp = self.new_temp()?;
        let mut hashing = HashingReader::new(reader);
        io::copy(&mut hashing, temp.as_file_mut())
            .map_err(|e| StoreError::io("receiving upload into staging", e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io("syncing staging file", e))?;
        let (hash, size) = hashing.finish();
        debug!(hash = %hash.short_hex(), size, "staged blob");
        Ok(StagedBlob::new(hash, size, StagedContent::File(temp)))
    }

    fn commit(&self, staged: StagedBlob, location: &BlobLocation) -> StoreResult<u64> {
        let size = staged.size();
        let temp = match staged.content {
            StagedContent::File(temp) => temp,
            StagedContent::Buffer(bytes) => {
                let mut temp = self.new_temp()?;
                temp.write_all(&bytes)
                    .and_then(|()| temp.as_file().sync_all())
                    .map_err(|e| StoreError::io("writing staging file", e))?;
                temp
            }
        };

        let dest = self.resolve_path(location);
        Self::ensure_parent(&dest)?;
        temp.persist(&dest)
            .map_err(|e| StoreError::io(format!("committing {location}"), e.error))?;
        debug!(%location, size, "committed blob");
        Ok(size)
    }

    fn exists(&self, location: &BlobLocation) -> StoreResult<bool> {
        match fs::metadata(self.resolve_path(location)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(format!("checking {location}"), e)),
        }
    }

    fn read(&self, location: &BlobLocation) -> StoreResult<Box<dyn Read + Send>> {
        match File::open(self.resolve_path(location)) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(location.to_string()))
            }
            Err(e) => Err(StoreError::io(format!("opening {location}"), e)),
        }
    }

    fn archive(&self, location: &BlobLocation, at: DateTime<Utc>) -> StoreResult<ArchivedBlob> {
        if !self.exists(location)? {
            return Err(StoreError::NotFound(location.to_string()));
        }
        let source = self.resolve_path(location);
        let base = archive_stamp(at);
        let (stamp, dest) = stamp_candidates(&base)
            .map(|stamp| {
                let dest = location.archive_path(&self.root, &stamp);
                (stamp, dest)
            })
            .find(|(_, dest)| !dest.exists())
            .ok_or_else(|| StoreError::io(format!("archiving {location}"), io::ErrorKind::AlreadyExists.into()))?;

        Self::ensure_parent(&dest)?;
        fs::rename(&source, &dest)
            .map_err(|e| StoreError::io(format!("archiving {location}"), e))?;
        debug!(%location, archive = %dest.display(), "archived blob");
        Ok(ArchivedBlob {
            origin: location.clone(),
            stamp,
            path: dest,
        })
    }

    fn restore(&self, archived: &ArchivedBlob) -> StoreResult<()> {
        let dest = self.resolve_path(&archived.origin);
        Self::ensure_parent(&dest)?;
        fs::rename(&archived.path, &dest)
            .map_err(|e| StoreError::io(format!("restoring {}", archived.origin), e))
    }

    fn remove(&self, location: &BlobLocation) -> StoreResult<bool> {
        match fs::remove_file(self.resolve_path(location)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(format!("removing {location}"), e)),
        }
    }

    fn resolve_path(&self, location: &BlobLocation) -> PathBuf {
        location.live_path(&self.root)
    }
}
