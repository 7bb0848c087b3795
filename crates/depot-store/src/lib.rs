//! Durable blob storage for the depot update server.
//!
//! Blobs are plain files addressed by `(area, collection, relative path)`:
//!
//! ```text
//! {root}/{area}/{collection}/{relative path}
//! {root}/{area}/deprecated/{collection}/{timestamp}/{relative path}
//! {root}/.staging/
//! ```
//!
//! # Write Protocol
//!
//! Writes are two-phase. [`BlobStore::stage`] copies an incoming stream into
//! a staging file while hashing it; [`BlobStore::commit`] renames the staged
//! file into place. A live path therefore only ever holds a complete file,
//! and the caller learns the digest of the new content before anything at
//! the live path is touched.
//!
//! Superseded content is never deleted: [`BlobStore::archive`] moves it into
//! the archive namespace, where it stays untracked and path-addressable.
//!
//! # Backends
//!
//! - [`FsBlobStore`] — durable, filesystem-backed
//! - [`InMemoryBlobStore`] — `HashMap`-based store for tests and embedding

pub mod error;
pub mod fs;
pub mod location;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use location::{archive_stamp, ArchivedBlob, Area, BlobLocation};
pub use memory::InMemoryBlobStore;
pub use traits::{BlobStore, StagedBlob};
