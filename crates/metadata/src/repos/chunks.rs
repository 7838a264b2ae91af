//! Chunk repository.

use crate::error::MetadataResult;
use crate::models::{ChunkRange, ChunkRow, NewChunk};
use async_trait::async_trait;

/// Repository for the parts of chunked uploads.
///
/// Rows are append-only. Concurrent writers of one file are not serialized; a
/// repeated chunk number surfaces as `AlreadyExists`.
#[async_trait]
pub trait ChunkRepo: Send + Sync {
    /// Record a received part.
    async fn record_chunk(&self, chunk: &NewChunk) -> MetadataResult<ChunkRow>;

    /// Get a single part by number.
    async fn get_chunk(
        &self,
        content_id: i64,
        chunk_number: i64,
    ) -> MetadataResult<Option<ChunkRow>>;

    /// All parts of a file, ordered by chunk number.
    async fn list_chunks(&self, content_id: i64) -> MetadataResult<Vec<ChunkRow>>;

    /// Min/max/count/total over the recorded parts, or `None` when nothing arrived yet.
    async fn chunk_range(&self, content_id: i64) -> MetadataResult<Option<ChunkRange>>;
}
