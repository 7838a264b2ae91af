//! Node catalog repository.

use crate::error::MetadataResult;
use crate::models::{ChildRow, NodeRow};
use async_trait::async_trait;
use larder_core::NodeKind;
use uuid::Uuid;

/// Repository for the directory/file hierarchy.
///
/// Every lookup that takes an `owner` is scoped to that owner: nodes belonging to
/// anyone else behave as if they did not exist.
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Create a directory under `parent` (or at the owner's root).
    ///
    /// The parent check, the duplicate check and the insert share one transaction.
    /// Returns `NotFound` for a missing, foreign or non-directory parent and
    /// `AlreadyExists` for a directory of the same name under the same parent.
    async fn create_directory(
        &self,
        owner: Uuid,
        name: &str,
        parent: Option<i64>,
    ) -> MetadataResult<NodeRow>;

    /// Exact-key lookup on `(owner, parent, name, kind)`.
    async fn find_row(
        &self,
        owner: Uuid,
        name: &str,
        kind: NodeKind,
        parent: Option<i64>,
    ) -> MetadataResult<Option<NodeRow>>;

    /// Primary-key lookup, regardless of owner.
    async fn get_node(&self, id: i64) -> MetadataResult<Option<NodeRow>>;

    /// Primary-key lookup restricted to `owner`.
    async fn get_owned_node(&self, owner: Uuid, id: i64) -> MetadataResult<Option<NodeRow>>;

    /// Direct children of `parent`, directories first, then by name and id.
    async fn list_children(
        &self,
        owner: Uuid,
        parent: Option<i64>,
    ) -> MetadataResult<Vec<ChildRow>>;

    /// `root` and all of its transitive descendants. Empty if `root` is missing or foreign.
    async fn subtree_ids(&self, owner: Uuid, root: i64) -> MetadataResult<Vec<i64>>;

    /// Parent chain of `node` up to the root, nearest first, excluding `node` itself.
    async fn ancestor_ids(&self, owner: Uuid, node: i64) -> MetadataResult<Vec<i64>>;

    /// Blob keys of every stored file and chunk under `root`.
    async fn subtree_blob_paths(&self, owner: Uuid, root: i64) -> MetadataResult<Vec<String>>;

    /// Remove `root`, its descendants, their contents and chunks. Returns nodes removed.
    async fn delete_subtree(&self, owner: Uuid, root: i64) -> MetadataResult<u64>;

    /// Change a node's name. `NotFound` if not owned, `AlreadyExists` on a sibling clash.
    async fn rename_node(&self, owner: Uuid, id: i64, name: &str) -> MetadataResult<()>;
}
