//! Recursive delete.

use crate::drive::Drive;
use crate::error::{DriveError, DriveResult};
use crate::tree::DeleteSummary;
use tracing::instrument;
use uuid::Uuid;

impl Drive {
    /// Delete a node and everything below it.
    ///
    /// Every stored blob in the subtree is removed first. Blob failures are logged
    /// and counted but never fail the call; the catalog rows always go.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn delete(&self, owner: Uuid, id: i64) -> DriveResult<DeleteSummary> {
        if self.owned_node(owner, id).await?.is_none() {
            return Err(DriveError::NotFound(format!("node {id}")));
        }

        let paths = self.metadata.subtree_blob_paths(owner, id).await?;
        let mut summary = DeleteSummary::default();
        for path in &paths {
            if self.discard_blob(path).await {
                summary.blobs_removed += 1;
            } else {
                summary.blobs_failed += 1;
            }
        }

        summary.nodes_removed = self.metadata.delete_subtree(owner, id).await?;

        tracing::info!(
            node_id = id,
            nodes_removed = summary.nodes_removed,
            blobs_removed = summary.blobs_removed,
            blobs_failed = summary.blobs_failed,
            "Subtree deleted"
        );
        Ok(summary)
    }
}
