//! Drive error types.

use larder_metadata::MetadataError;
use larder_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a [`DriveError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input: names, sizes, unusable sources.
    Validation,
    /// The request collides with existing state.
    Conflict,
    /// Missing, or owned by someone else.
    NotFound,
    QuotaExceeded,
    /// The blob store failed.
    BackendIo,
    /// The catalog failed.
    UnexpectedStore,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::QuotaExceeded => "quota_exceeded",
            Self::BackendIo => "backend_io",
            Self::UnexpectedStore => "unexpected_store",
        }
    }

    /// Whether the error message is meant to be shown to the user as-is.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::BackendIo | Self::UnexpectedStore)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drive operation errors.
///
/// Backend and catalog failures display a generic message; the underlying error is
/// kept as the `source` and logged when the error is created.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("unsafe filename: {0}")]
    UnsafeFilename(String),

    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("file is {size} bytes, larger than the {limit} byte direct upload limit; use a chunked upload")]
    UseChunkedUpload { size: u64, limit: u64 },

    #[error("upload source cannot be rewound")]
    NotSeekable,

    #[error("storage quota exceeded: {used} bytes used, {incoming} incoming, {ceiling} allowed")]
    QuotaExceeded { used: u64, incoming: u64, ceiling: u64 },

    #[error("parent directory not found")]
    ParentNotFound,

    #[error("a directory named '{0}' already exists here")]
    DirectoryExists(String),

    #[error("a file named '{0}' already exists here")]
    FilenameExists(String),

    #[error("name already in use: {0}")]
    NameExists(String),

    #[error("cannot move a directory into itself")]
    MovingIntoSelf,

    #[error("cannot move a directory into one of its own subdirectories")]
    ParentIsAncestorOfMoved,

    #[error("some of the items to move no longer exist")]
    StructureNotFound,

    #[error("{0} not found")]
    NotFound(String),

    #[error("file upload has not completed yet")]
    UploadIncomplete,

    #[error("upload is already complete")]
    UploadAlreadyComplete,

    #[error("chunk {0} was already received")]
    ChunkExists(u32),

    #[error("chunks must be numbered contiguously from 0")]
    ChunksNotContiguous,

    #[error("failed to read the uploaded data")]
    ReadFailed(#[source] std::io::Error),

    #[error("failed to save file")]
    SaveFailed(#[source] StorageError),

    #[error("failed to fetch file")]
    FetchFailed(#[source] StorageError),

    #[error("internal storage error")]
    Store(#[source] MetadataError),
}

impl DriveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_)
            | Self::UnsafeFilename(_)
            | Self::TooLarge { .. }
            | Self::UseChunkedUpload { .. }
            | Self::NotSeekable => ErrorKind::Validation,
            Self::DirectoryExists(_)
            | Self::FilenameExists(_)
            | Self::NameExists(_)
            | Self::MovingIntoSelf
            | Self::ParentIsAncestorOfMoved
            | Self::UploadIncomplete
            | Self::UploadAlreadyComplete
            | Self::ChunkExists(_)
            | Self::ChunksNotContiguous => ErrorKind::Conflict,
            Self::ParentNotFound | Self::StructureNotFound | Self::NotFound(_) => {
                ErrorKind::NotFound
            }
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::ReadFailed(_) | Self::SaveFailed(_) | Self::FetchFailed(_) => {
                ErrorKind::BackendIo
            }
            Self::Store(_) => ErrorKind::UnexpectedStore,
        }
    }

    /// Stable error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "invalid_name",
            Self::UnsafeFilename(_) => "unsafe_filename",
            Self::TooLarge { .. } => "too_large",
            Self::UseChunkedUpload { .. } => "use_chunked_upload",
            Self::NotSeekable => "not_seekable",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::ParentNotFound => "parent_not_found",
            Self::DirectoryExists(_) => "directory_exists",
            Self::FilenameExists(_) => "filename_exists",
            Self::NameExists(_) => "name_exists",
            Self::MovingIntoSelf => "moving_into_self",
            Self::ParentIsAncestorOfMoved => "parent_is_ancestor_of_moved",
            Self::StructureNotFound => "structure_not_found",
            Self::NotFound(_) => "not_found",
            Self::UploadIncomplete => "upload_incomplete",
            Self::UploadAlreadyComplete => "upload_already_complete",
            Self::ChunkExists(_) => "chunk_exists",
            Self::ChunksNotContiguous => "chunks_not_contiguous",
            Self::ReadFailed(_) => "read_failed",
            Self::SaveFailed(_) => "save_failed",
            Self::FetchFailed(_) => "fetch_failed",
            Self::Store(_) => "store_error",
        }
    }

    pub(crate) fn save_failed(key: &str, error: StorageError) -> Self {
        tracing::error!(key = %key, error = %error, "Blob save failed");
        Self::SaveFailed(error)
    }

    pub(crate) fn fetch_failed(key: &str, error: StorageError) -> Self {
        tracing::error!(key = %key, error = %error, "Blob fetch failed");
        Self::FetchFailed(error)
    }

    pub(crate) fn read_failed(error: std::io::Error) -> Self {
        tracing::error!(error = %error, "Reading upload source failed");
        Self::ReadFailed(error)
    }
}

impl From<MetadataError> for DriveError {
    fn from(error: MetadataError) -> Self {
        tracing::error!(error = %error, "Catalog operation failed");
        Self::Store(error)
    }
}

impl From<larder_core::Error> for DriveError {
    fn from(error: larder_core::Error) -> Self {
        match error {
            larder_core::Error::UnsafeFilename(msg) => Self::UnsafeFilename(msg),
            other => Self::InvalidName(other.to_string()),
        }
    }
}

/// Result type for drive operations.
pub type DriveResult<T> = std::result::Result<T, DriveError>;
