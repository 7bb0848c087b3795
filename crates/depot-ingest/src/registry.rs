//! Immutable client releases.
//!
//! A version is published exactly once. Unlike game files there is no
//! content comparison: a second upload under an existing version is
//! rejected whatever its bytes, and the stored binary never changes.
//! Only the release notes can be edited afterwards.

use std::io::Read;
use std::sync::Arc;

use depot_catalog::{CatalogError, ReleaseCatalog, ReleaseRecord};
use depot_store::{BlobLocation, BlobStore};
use depot_types::{ContentHash, RelativePath, TypeError, Version};
use tracing::{error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{IngestError, IngestResult};
use crate::locks::KeyedLocks;
use crate::update::{ClientUpdateInfo, MandatoryPolicy};

/// Placeholder returned when a release has no notes.
pub const DEFAULT_RELEASE_NOTES: &str = "No release notes provided.";

/// Registry of client releases, keyed by version.
pub struct VersionRegistry {
    store: Arc<dyn BlobStore>,
    catalog: Arc<dyn ReleaseCatalog>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks<Version>,
    policy: MandatoryPolicy,
}

impl VersionRegistry {
    pub fn new(store: Arc<dyn BlobStore>, catalog: Arc<dyn ReleaseCatalog>) -> Self {
        Self {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            locks: KeyedLocks::new(),
            policy: MandatoryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: MandatoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MandatoryPolicy {
        self.policy
    }

    /// Publish a new release binary.
    ///
    /// `file_name` must be a single path component; the binary is stored at
    /// `client/{version}/{file_name}`. Fails with [`IngestError::Conflict`]
    /// if the version already exists, leaving the existing release intact.
    #[instrument(skip(self, content), fields(version = %version, file = %file_name))]
    pub fn publish(
        &self,
        version: &Version,
        file_name: &RelativePath,
        content: &mut dyn Read,
    ) -> IngestResult<ReleaseRecord> {
        if file_name.components().count() != 1 {
            return Err(IngestError::InvalidInput(TypeError::InvalidPath {
                value: file_name.to_string(),
                reason: "release file name must be a single component".into(),
            }));
        }

        let _guard = self.locks.lock(version);
        if self.catalog.get_release(version)?.is_some() {
            warn!("release already exists; upload rejected");
            return Err(IngestError::Conflict(version.clone()));
        }

        let location = BlobLocation::release(version, file_name);
        let staged = self.store.stage(content)?;
        let hash = staged.hash();
        let size = self.store.commit(staged, &location)?;

        let record = ReleaseRecord {
            version: version.clone(),
            name: file_name.to_string(),
            size,
            hash,
            uploaded_at: self.clock.now(),
            storage_path: self.store.resolve_path(&location),
            release_notes: None,
        };
        if let Err(e) = self.catalog.insert_release(record.clone()) {
            if let Err(cleanup) = self.store.remove(&location) {
                error!(%location, error = %cleanup, "failed to remove uncatalogued release");
            }
            return Err(match e {
                CatalogError::Conflict { .. } => IngestError::Conflict(version.clone()),
                other => other.into(),
            });
        }

        info!(hash = %hash.short_hex(), size, "release published");
        Ok(record)
    }

    /// Like [`publish`](Self::publish), but reports an existing version as
    /// `Ok(false)` instead of an error.
    pub fn ingest_version(
        &self,
        version: &Version,
        file_name: &RelativePath,
        content: &mut dyn Read,
    ) -> IngestResult<bool> {
        match self.publish(version, file_name, content) {
            Ok(_) => Ok(true),
            Err(IngestError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The most recently uploaded release.
    pub fn latest(&self) -> IngestResult<ReleaseRecord> {
        self.catalog
            .latest_release()?
            .ok_or_else(|| IngestError::NotFound("no releases published".into()))
    }

    pub fn latest_version(&self) -> IngestResult<Version> {
        Ok(self.latest()?.version)
    }

    /// Release notes (or [`DEFAULT_RELEASE_NOTES`]) and binary hash of a
    /// release.
    pub fn release_notes_and_hash(&self, version: &Version) -> IngestResult<(String, ContentHash)> {
        let record = self.locate_release(version)?;
        Ok((notes_or_default(&record), record.hash))
    }

    /// Replace the notes of an existing release. Returns `false` if the
    /// version is unknown; nothing is created in that case.
    pub fn set_release_notes(&self, version: &Version, notes: &str) -> IngestResult<bool> {
        let updated = self
            .catalog
            .set_release_notes(version, Some(notes.to_string()))?;
        if updated {
            info!(%version, "release notes updated");
        } else {
            warn!(%version, "release notes not set: unknown version");
        }
        Ok(updated)
    }

    pub fn locate_release(&self, version: &Version) -> IngestResult<ReleaseRecord> {
        self.catalog
            .get_release(version)?
            .ok_or_else(|| IngestError::NotFound(format!("release {version}")))
    }

    /// Release record plus a reader over its binary. Waits for an in-flight
    /// publish of the same version to finish.
    pub fn open_release(&self, version: &Version) -> IngestResult<(ReleaseRecord, Box<dyn Read + Send>)> {
        let _guard = self.locks.lock(version);
        let record = self.locate_release(version)?;
        let file_name = RelativePath::new(record.name.clone())?;
        let reader = self.store.read(&BlobLocation::release(version, &file_name))?;
        Ok((record, reader))
    }

    /// All releases, newest first.
    pub fn releases(&self) -> IngestResult<Vec<ReleaseRecord>> {
        Ok(self.catalog.list_releases()?)
    }

    /// What a client running `current` should be told.
    ///
    /// Never fails: if there is no latest release, or it cannot be read,
    /// the answer is [`ClientUpdateInfo::no_updates`].
    pub fn client_update_info(&self, current: &str) -> ClientUpdateInfo {
        match self.latest() {
            Ok(latest) => ClientUpdateInfo {
                is_mandatory: self.policy.is_mandatory(current, &latest.version),
                release_notes: notes_or_default(&latest),
                file_hash: Some(latest.hash),
                latest_version: Some(latest.version),
            },
            Err(e) => {
                warn!(current, error = %e, "update check found no release");
                ClientUpdateInfo::no_updates()
            }
        }
    }
}

fn notes_or_default(record: &ReleaseRecord) -> String {
    match record.release_notes.as_deref() {
        Some(notes) if !notes.trim().is_empty() => notes.to_string(),
        _ => DEFAULT_RELEASE_NOTES.to_string(),
    }
}

impl std::fmt::Debug for VersionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionRegistry")
            .field("policy", &self.policy)
            .finish()
    }
}
