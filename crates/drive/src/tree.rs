//! Listing and reporting types returned to callers.

use larder_core::NodeKind;
use larder_metadata::models::ChildRow;
use larder_storage::ByteStream;
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

/// One entry in a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub id: i64,
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<i64>,
    /// File size in bytes; `None` for directories.
    pub size: Option<u64>,
    pub extension: Option<String>,
    pub is_chunked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ChildRow> for TreeEntry {
    fn from(row: ChildRow) -> Self {
        let is_file = row.node.kind.is_file();
        Self {
            id: row.node.id,
            name: row.node.name,
            kind: row.node.kind,
            parent: row.node.parent_id,
            size: if is_file {
                Some(row.size_bytes.and_then(|s| u64::try_from(s).ok()).unwrap_or(0))
            } else {
                None
            },
            extension: row.extension,
            is_chunked: row.is_chunked.unwrap_or(false),
            created_at: row.node.created_at,
            updated_at: row.node.updated_at,
        }
    }
}

/// Quota usage of one owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SpaceReport {
    pub total: u64,
    pub used: u64,
}

impl SpaceReport {
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }
}

/// Progress of a chunked upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub count: u64,
    pub total_size: u64,
}

/// Outcome of a recursive delete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub nodes_removed: u64,
    pub blobs_removed: u64,
    pub blobs_failed: u64,
}

/// A file opened for reading.
pub struct FileDownload {
    pub stream: ByteStream,
    pub original_name: String,
    pub size: u64,
}

impl fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDownload")
            .field("original_name", &self.original_name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
