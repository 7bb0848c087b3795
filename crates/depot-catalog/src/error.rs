//! Error types for catalog operations.

use std::io;

use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A release with this version already exists.
    #[error("release already exists: {version}")]
    Conflict { version: String },

    /// The persisted catalog was written by an incompatible schema.
    #[error("catalog schema mismatch: expected version {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: u32 },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while loading or flushing a persisted catalog.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// An in-memory lock was poisoned by a panicking writer.
    #[error("catalog lock poisoned")]
    Poisoned,
}

/// Convenience type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
