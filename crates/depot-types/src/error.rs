use thiserror::Error;

/// Errors produced when parsing or validating depot types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid collection id {value:?}: {reason}")]
    InvalidCollection { value: String, reason: String },

    #[error("invalid relative path {value:?}: {reason}")]
    InvalidPath { value: String, reason: String },

    #[error("invalid version {value:?}: {reason}")]
    InvalidVersion { value: String, reason: String },
}
