//! Per-owner drive engine for larder.
//!
//! [`Drive`] composes the catalog ([`larder_metadata`]) and a blob store
//! ([`larder_storage`]) into the operations a drive exposes:
//! - directory creation, listing and file download
//! - direct uploads and chunked uploads (prepare, append, finalize)
//! - bulk moves, renames and recursive deletes
//! - quota accounting
//!
//! Callers supply an already-authenticated owner id to every operation.

mod drive;
pub mod error;
pub mod quota;
mod relocate;
mod remove;
pub mod source;
pub mod tree;
mod upload;

pub use drive::{Drive, UploadLimits};
pub use error::{DriveError, DriveResult, ErrorKind};
pub use quota::QuotaAccountant;
pub use source::{BytesSource, FileSource, StreamSource, UploadSource};
pub use tree::{ChunkInfo, DeleteSummary, FileDownload, SpaceReport, TreeEntry};
