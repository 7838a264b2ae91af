//! Database models mapping to the catalog schema.

use larder_core::NodeKind;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Nodes
// =============================================================================

/// Directory or file in an owner's namespace.
#[derive(Debug, Clone, FromRow)]
pub struct NodeRow {
    pub id: i64,
    pub owner_id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: NodeKind,
    /// `None` for nodes at the owner's root.
    pub parent_id: Option<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl NodeRow {
    pub fn is_owned_by(&self, owner: Uuid) -> bool {
        self.owner_id == owner
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }
}

/// Values for a node insert.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub owner_id: Uuid,
    pub name: String,
    pub kind: NodeKind,
    pub parent_id: Option<i64>,
}

/// A child node joined with its file content, if it has one.
#[derive(Debug, Clone, FromRow)]
pub struct ChildRow {
    #[sqlx(flatten)]
    pub node: NodeRow,
    pub content_id: Option<i64>,
    pub content_path: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: Option<i64>,
    pub is_chunked: Option<bool>,
}

// =============================================================================
// File contents
// =============================================================================

/// Stored content of a file node.
#[derive(Debug, Clone, FromRow)]
pub struct FileContentRow {
    pub id: i64,
    pub node_id: i64,
    /// Blob key; `None` while a chunked upload is pending.
    pub path: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: i64,
    pub is_chunked: bool,
    pub created_at: OffsetDateTime,
}

impl FileContentRow {
    /// A chunked upload that has not been reassembled yet.
    pub fn is_pending(&self) -> bool {
        self.is_chunked && self.path.is_none()
    }
}

/// Values for a file content insert.
#[derive(Debug, Clone)]
pub struct NewFileContent {
    pub node_id: i64,
    pub path: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: i64,
    pub is_chunked: bool,
}

// =============================================================================
// Chunks
// =============================================================================

/// One received part of a chunked upload.
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRow {
    pub id: i64,
    pub content_id: i64,
    pub chunk_number: i64,
    pub path: String,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
}

/// Values for a chunk insert.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content_id: i64,
    pub chunk_number: i64,
    pub path: String,
    pub size_bytes: i64,
}

/// Aggregate view of the chunks recorded for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct ChunkRange {
    pub min_chunk: i64,
    pub max_chunk: i64,
    pub chunk_count: i64,
    pub total_size: i64,
}

impl ChunkRange {
    /// True when every number between min and max has been recorded.
    pub fn is_contiguous(&self) -> bool {
        self.chunk_count == self.max_chunk - self.min_chunk + 1
    }
}
