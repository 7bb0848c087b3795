//! Foundation types for the depot update server.
//!
//! Every other depot crate depends on `depot-types`. The types here are
//! validated newtypes: once constructed they are safe to use as catalog keys
//! and as components of on-disk storage paths.
//!
//! # Key Types
//!
//! - [`ContentHash`] — 32-byte content digest, hex-encoded on the wire
//! - [`CollectionId`] — namespace of related artifacts (one game's file set)
//! - [`RelativePath`] — normalized `/`-separated path inside a collection
//! - [`Version`] — client release version string

pub mod error;
pub mod hash;
pub mod names;
pub mod version;

pub use error::TypeError;
pub use hash::ContentHash;
pub use names::{CollectionId, RelativePath, RESERVED_COLLECTION};
pub use version::Version;
