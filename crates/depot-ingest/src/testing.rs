//! Store wrappers shared by the engine and registry tests.

use std::io::Read;
use std::path::PathBuf;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use depot_store::{ArchivedBlob, BlobLocation, BlobStore, InMemoryBlobStore, StagedBlob, StoreResult};

/// In-memory store whose next commit announces itself, then stalls briefly
/// so another thread can act while the write is half done.
pub(crate) struct PausingStore {
    inner: InMemoryBlobStore,
    entered: Mutex<Option<mpsc::Sender<()>>>,
}

impl PausingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            entered: Mutex::new(None),
        }
    }

    /// The returned receiver fires when the next commit begins.
    pub(crate) fn pause_next_commit(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        *self.entered.lock().unwrap() = Some(tx);
        rx
    }
}

impl BlobStore for PausingStore {
    fn stage(&self, reader: &mut dyn Read) -> StoreResult<StagedBlob> {
        self.inner.stage(reader)
    }

    fn commit(&self, staged: StagedBlob, location: &BlobLocation) -> StoreResult<u64> {
        let entered = self.entered.lock().unwrap().take();
        if let Some(tx) = entered {
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
        }
        self.inner.commit(staged, location)
    }

    fn exists(&self, location: &BlobLocation) -> StoreResult<bool> {
        self.inner.exists(location)
    }

    fn read(&self, location: &BlobLocation) -> StoreResult<Box<dyn Read + Send>> {
        self.inner.read(location)
    }

    fn archive(&self, location: &BlobLocation, at: DateTime<Utc>) -> StoreResult<ArchivedBlob> {
        self.inner.archive(location, at)
    }

    fn restore(&self, archived: &ArchivedBlob) -> StoreResult<()> {
        self.inner.restore(archived)
    }

    fn remove(&self, location: &BlobLocation) -> StoreResult<bool> {
        self.inner.remove(location)
    }

    fn resolve_path(&self, location: &BlobLocation) -> PathBuf {
        self.inner.resolve_path(location)
    }
}
