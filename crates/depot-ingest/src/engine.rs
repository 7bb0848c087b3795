//! Ingestion of mutable game files.
//!
//! The engine decides whether an upload is new, unchanged, or a change, and
//! orders the store and catalog operations so that the catalog never points
//! at content that is not there:
//!
//! 1. Stage the upload, hashing it in the same pass.
//! 2. If a live file exists and its digest matches, discard the staging copy
//!    and report `Unchanged`.
//! 3. If it differs, archive the live file, commit the staged one, then
//!    upsert the catalog. A failed commit restores the archived file; a
//!    failed upsert removes the new file and restores the archived one.
//! 4. If nothing exists, commit, then upsert. A failed upsert removes the
//!    new file.

use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use depot_catalog::{ArtifactCatalog, ArtifactKey, ArtifactRecord};
use depot_store::{ArchivedBlob, BlobLocation, BlobStore, StagedBlob};
use depot_types::{CollectionId, ContentHash, RelativePath};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{IngestError, IngestResult};
use crate::locks::KeyedLocks;

/// An artifact upload, minus its body.
#[derive(Clone, Debug)]
pub struct IngestRequest {
    pub collection: CollectionId,
    pub path: RelativePath,
    /// Modification time of the source file, if the uploader reported one.
    /// Defaults to the ingestion time.
    pub modified_at: Option<DateTime<Utc>>,
}

impl IngestRequest {
    pub fn new(collection: CollectionId, path: RelativePath) -> Self {
        Self {
            collection,
            path,
            modified_at: None,
        }
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.collection.clone(), self.path.clone())
    }
}

/// What an ingestion did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First content stored for this key.
    Created(ArtifactRecord),
    /// Content changed; the previous file was archived.
    Updated {
        record: ArtifactRecord,
        archived: ArchivedBlob,
    },
    /// Byte-identical to what is already stored. Nothing was written.
    Unchanged(ArtifactRecord),
}

/// Discriminant of [`IngestOutcome`], for responses and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestKind {
    Created,
    Updated,
    Unchanged,
}

impl IngestOutcome {
    pub fn kind(&self) -> IngestKind {
        match self {
            IngestOutcome::Created(_) => IngestKind::Created,
            IngestOutcome::Updated { .. } => IngestKind::Updated,
            IngestOutcome::Unchanged(_) => IngestKind::Unchanged,
        }
    }

    /// The catalog record after ingestion.
    pub fn record(&self) -> &ArtifactRecord {
        match self {
            IngestOutcome::Created(record)
            | IngestOutcome::Updated { record, .. }
            | IngestOutcome::Unchanged(record) => record,
        }
    }
}

/// Orchestrates hashing, blob storage, archiving and catalog updates for
/// game files.
pub struct IngestionEngine {
    store: Arc<dyn BlobStore>,
    catalog: Arc<dyn ArtifactCatalog>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks<ArtifactKey>,
}

impl IngestionEngine {
    pub fn new(store: Arc<dyn BlobStore>, catalog: Arc<dyn ArtifactCatalog>) -> Self {
        Self {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            locks: KeyedLocks::new(),
        }
    }

    /// Replace the clock used for upload and archive timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Ingest one artifact.
    ///
    /// Concurrent calls for the same `(collection, path)` are serialized;
    /// the catalog reflects whichever completes last.
    #[instrument(skip(self, content), fields(collection = %request.collection, path = %request.path))]
    pub fn ingest(&self, request: &IngestRequest, content: &mut dyn Read) -> IngestResult<IngestOutcome> {
        let key = request.key();
        let _guard = self.locks.lock(&key);
        let location = BlobLocation::artifact(&request.collection, &request.path);

        let staged = self.store.stage(content)?;
        let now = self.clock.now();

        if !self.store.exists(&location)? {
            return self.create(request, &key, &location, staged, now);
        }

        let previous = self.store.digest(&location)?;
        let (hash, size) = (staged.hash(), staged.size());
        if previous == hash {
            drop(staged);
            return self.unchanged(request, &key, &location, hash, size, now);
        }

        let archived = self.store.archive(&location, now)?;
        if let Err(e) = self.store.commit(staged, &location) {
            self.restore_archived(&archived);
            return Err(e.into());
        }

        let record = self.build_record(request, &location, hash, size, now);
        if let Err(e) = self.catalog.upsert_artifact(record.clone()) {
            self.discard_new(&location);
            self.restore_archived(&archived);
            return Err(e.into());
        }

        info!(
            hash = %hash.short_hex(),
            previous = %previous.short_hex(),
            size,
            archive = %archived.path.display(),
            "artifact updated"
        );
        Ok(IngestOutcome::Updated { record, archived })
    }

    fn create(
        &self,
        request: &IngestRequest,
        key: &ArtifactKey,
        location: &BlobLocation,
        staged: StagedBlob,
        now: DateTime<Utc>,
    ) -> IngestResult<IngestOutcome> {
        let hash = staged.hash();
        let size = self.store.commit(staged, location)?;
        let record = self.build_record(request, location, hash, size, now);
        if let Err(e) = self.catalog.upsert_artifact(record.clone()) {
            self.discard_new(location);
            return Err(e.into());
        }
        info!(%key, hash = %hash.short_hex(), size, "artifact created");
        Ok(IngestOutcome::Created(record))
    }

    /// Live bytes already match the upload. Normally the catalog agrees and
    /// nothing is touched; a missing or stale row is rewritten from the live
    /// file.
    fn unchanged(
        &self,
        request: &IngestRequest,
        key: &ArtifactKey,
        location: &BlobLocation,
        hash: ContentHash,
        size: u64,
        now: DateTime<Utc>,
    ) -> IngestResult<IngestOutcome> {
        match self.catalog.get_artifact(key)? {
            Some(record) if record.hash == hash => {
                debug!(%key, hash = %hash.short_hex(), "artifact unchanged");
                Ok(IngestOutcome::Unchanged(record))
            }
            existing => {
                let record = self.build_record(request, location, hash, size, now);
                self.catalog.upsert_artifact(record.clone())?;
                warn!(%key, "catalog entry did not match stored content; rewritten");
                Ok(match existing {
                    None => IngestOutcome::Created(record),
                    Some(_) => IngestOutcome::Unchanged(record),
                })
            }
        }
    }

    fn build_record(
        &self,
        request: &IngestRequest,
        location: &BlobLocation,
        hash: ContentHash,
        size: u64,
        now: DateTime<Utc>,
    ) -> ArtifactRecord {
        ArtifactRecord {
            collection: request.collection.clone(),
            path: request.path.clone(),
            name: request.path.file_name().to_string(),
            size,
            hash,
            uploaded_at: now,
            modified_at: request.modified_at.unwrap_or(now),
            storage_path: self.store.resolve_path(location),
        }
    }

    fn restore_archived(&self, archived: &ArchivedBlob) {
        if let Err(e) = self.store.restore(archived) {
            error!(
                location = %archived.origin,
                archive = %archived.path.display(),
                error = %e,
                "failed to restore archived artifact; live path is empty"
            );
        }
    }

    fn discard_new(&self, location: &BlobLocation) {
        if let Err(e) = self.store.remove(location) {
            error!(%location, error = %e, "failed to remove uncatalogued artifact");
        }
    }

    /// All catalogued artifacts in `collection`, sorted by path.
    pub fn manifest(&self, collection: &CollectionId) -> IngestResult<Vec<ArtifactRecord>> {
        Ok(self.catalog.list_artifacts(collection)?)
    }

    /// Every collection with at least one artifact.
    pub fn collections(&self) -> IngestResult<Vec<CollectionId>> {
        Ok(self.catalog.collections()?)
    }

    /// Catalog record for one artifact.
    pub fn locate(&self, collection: &CollectionId, path: &RelativePath) -> IngestResult<ArtifactRecord> {
        let key = ArtifactKey::new(collection.clone(), path.clone());
        self.catalog
            .get_artifact(&key)?
            .ok_or_else(|| IngestError::NotFound(format!("artifact {key}")))
    }

    /// Catalog record plus a reader over the stored bytes.
    ///
    /// Holds the artifact's lock while the record is looked up and the blob
    /// opened, so the pair always describes the same content. The returned
    /// reader stays valid after a later update replaces the live file.
    pub fn open(
        &self,
        collection: &CollectionId,
        path: &RelativePath,
    ) -> IngestResult<(ArtifactRecord, Box<dyn Read + Send>)> {
        let key = ArtifactKey::new(collection.clone(), path.clone());
        let _guard = self.locks.lock(&key);
        let record = self.locate(collection, path)?;
        let reader = self.store.read(&BlobLocation::artifact(collection, path))?;
        Ok((record, reader))
    }
}

impl std::fmt::Debug for IngestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionEngine")
            .field("locks_held", &self.locks.held_count())
            .finish()
    }
}
