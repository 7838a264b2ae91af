//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("unsafe filename: {0}")]
    UnsafeFilename(String),

    #[error("invalid node kind: {0}")]
    InvalidNodeKind(String),

    #[error("invalid upload handle: {0}")]
    InvalidUploadHandle(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
