use depot_catalog::CatalogError;
use depot_store::StoreError;
use depot_types::{TypeError, Version};

/// Errors from ingestion and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// No artifact or release matches the lookup.
    #[error("not found: {0}")]
    NotFound(String),

    /// A release with this version already exists.
    #[error("version already exists: {0}")]
    Conflict(Version),

    /// Caller-supplied identifier failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] TypeError),

    /// Blob store failure (missing source, permissions, disk full).
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Catalog failure.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;
