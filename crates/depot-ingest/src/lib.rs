//! Ingestion engine and version registry for the depot update server.
//!
//! This crate decides what happens to an uploaded file:
//!
//! - [`IngestionEngine`] handles mutable game files. Content is hashed while
//!   it is staged; byte-identical re-uploads are no-ops, changed content
//!   archives the previous file before the new one is committed, and the
//!   catalog is only updated after the new file is in place.
//! - [`VersionRegistry`] handles immutable client releases. A version can be
//!   published once; later uploads under the same version are rejected.
//!
//! Ingestion of the same key is serialized by [`KeyedLocks`]; distinct keys
//! proceed in parallel.

pub mod clock;
pub mod engine;
pub mod error;
pub mod locks;
pub mod registry;
#[cfg(test)]
mod testing;
pub mod update;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{IngestKind, IngestOutcome, IngestRequest, IngestionEngine};
pub use error::{IngestError, IngestResult};
pub use locks::{KeyGuard, KeyedLocks};
pub use registry::{VersionRegistry, DEFAULT_RELEASE_NOTES};
pub use update::{ClientUpdateInfo, MandatoryPolicy, NO_UPDATES_NOTES};
