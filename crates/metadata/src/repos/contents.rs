//! File content repository.

use crate::error::MetadataResult;
use crate::models::FileContentRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for the content attached to file nodes.
#[async_trait]
pub trait FileContentRepo: Send + Sync {
    /// Get a content row by id.
    async fn get_content(&self, id: i64) -> MetadataResult<Option<FileContentRow>>;

    /// Get the content row attached to a file node.
    async fn get_content_for_node(&self, node_id: i64) -> MetadataResult<Option<FileContentRow>>;

    /// Highest content id ever issued, or 0 for an empty catalog.
    async fn max_content_id(&self) -> MetadataResult<i64>;

    /// Sum of content sizes over every file the owner has, at any depth.
    async fn used_bytes(&self, owner: Uuid) -> MetadataResult<i64>;
}
