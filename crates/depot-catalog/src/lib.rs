//! Persistent metadata catalog for the depot update server.
//!
//! The catalog maps keys to stored-file metadata. It holds two tables with
//! different uniqueness policies:
//!
//! - **Artifacts** are keyed by `(collection, relative path)` and upserted on
//!   every ingestion whose content changed.
//! - **Releases** are keyed by version and insert-only: a second insert of
//!   the same version is a [`CatalogError::Conflict`]. Only the release notes
//!   may change after creation.
//!
//! # Modules
//!
//! - [`record`] — [`ArtifactRecord`], [`ReleaseRecord`], [`ArtifactKey`]
//! - [`traits`] — [`ArtifactCatalog`] and [`ReleaseCatalog`]
//! - [`memory`] — [`InMemoryCatalog`] for tests
//! - [`json`] — [`JsonFileCatalog`], a single JSON document flushed atomically

pub mod error;
#[cfg(test)]
mod fixtures;
pub mod json;
pub mod memory;
pub mod record;
mod state;
pub mod traits;

pub use error::{CatalogError, CatalogResult};
pub use json::{JsonFileCatalog, SCHEMA_VERSION};
pub use memory::InMemoryCatalog;
pub use record::{ArtifactKey, ArtifactRecord, ReleaseRecord, UpsertOutcome};
pub use traits::{ArtifactCatalog, ReleaseCatalog};
