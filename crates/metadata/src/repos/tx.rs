//! Unit of work spanning several catalog statements.

use crate::error::MetadataResult;
use crate::models::{FileContentRow, NewFileContent, NewNode, NodeRow};
use async_trait::async_trait;
use larder_core::NodeKind;
use uuid::Uuid;

/// An open catalog transaction.
///
/// Dropping it without calling [`CatalogTx::commit`] rolls back every statement.
/// While one is open, callers must not issue queries through the store itself.
#[async_trait]
pub trait CatalogTx: Send {
    async fn get_node(&mut self, id: i64) -> MetadataResult<Option<NodeRow>>;

    async fn find_row(
        &mut self,
        owner: Uuid,
        name: &str,
        kind: NodeKind,
        parent: Option<i64>,
    ) -> MetadataResult<Option<NodeRow>>;

    /// Number of `ids` that exist and belong to `owner`.
    async fn count_owned(&mut self, owner: Uuid, ids: &[i64]) -> MetadataResult<i64>;

    /// Point every node in `ids` at `new_parent`.
    ///
    /// Any number of ids is accepted; they are updated in bounded statements inside the
    /// open transaction. A sibling name clash at the destination is `AlreadyExists`.
    async fn batch_relocate(
        &mut self,
        owner: Uuid,
        new_parent: Option<i64>,
        ids: &[i64],
    ) -> MetadataResult<u64>;

    async fn insert_node(&mut self, node: &NewNode) -> MetadataResult<NodeRow>;

    async fn insert_content(&mut self, content: &NewFileContent)
    -> MetadataResult<FileContentRow>;

    /// Attach the reassembled blob to a pending chunked content row.
    async fn complete_chunked_content(
        &mut self,
        content_id: i64,
        path: &str,
        size_bytes: i64,
    ) -> MetadataResult<()>;

    /// Drop every chunk row of a content. Returns rows removed.
    async fn delete_chunks(&mut self, content_id: i64) -> MetadataResult<u64>;

    async fn commit(self: Box<Self>) -> MetadataResult<()>;

    async fn rollback(self: Box<Self>) -> MetadataResult<()>;
}
