//! Moving and renaming nodes.

use crate::drive::Drive;
use crate::error::{DriveError, DriveResult};
use larder_core::sanitize_name;
use larder_metadata::MetadataError;
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;

/// Drop repeated ids, keeping first occurrences in order.
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl Drive {
    /// Move nodes under `destination`, or to the root when it is `None`.
    ///
    /// All batches share one unit of work: either every node moves or none does.
    #[instrument(skip(self, ids), fields(owner = %owner, count = ids.len()))]
    pub async fn move_nodes(
        &self,
        owner: Uuid,
        ids: &[i64],
        destination: Option<i64>,
    ) -> DriveResult<()> {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return Ok(());
        }

        if let Some(dest_id) = destination {
            self.require_parent(owner, destination).await?;

            let ancestors: HashSet<i64> = self
                .metadata
                .ancestor_ids(owner, dest_id)
                .await?
                .into_iter()
                .collect();
            if ids.iter().any(|id| ancestors.contains(id)) {
                return Err(DriveError::ParentIsAncestorOfMoved);
            }

            if ids.contains(&dest_id) {
                return Err(DriveError::MovingIntoSelf);
            }
        }

        let batch_size = self.config.move_batch_size.max(1);
        let mut tx = self.metadata.begin().await?;
        for batch in ids.chunks(batch_size) {
            let owned = tx.count_owned(owner, batch).await?;
            if owned != batch.len() as i64 {
                tracing::debug!(
                    expected = batch.len(),
                    found = owned,
                    "Move batch references missing nodes"
                );
                return Err(DriveError::StructureNotFound);
            }

            tx.batch_relocate(owner, destination, batch)
                .await
                .map_err(|e| match e {
                    MetadataError::AlreadyExists(_) => DriveError::NameExists(
                        "the destination already holds an item of the same name".to_string(),
                    ),
                    other => other.into(),
                })?;
        }
        tx.commit().await?;

        tracing::info!(moved = ids.len(), destination = ?destination, "Nodes moved");
        Ok(())
    }

    /// Rename a node in place.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn rename(&self, owner: Uuid, id: i64, new_name: &str) -> DriveResult<()> {
        let node = self
            .owned_node(owner, id)
            .await?
            .ok_or_else(|| DriveError::NotFound(format!("node {id}")))?;

        let name = sanitize_name(new_name)?;
        if name.as_str() == node.name {
            return Ok(());
        }

        if self
            .metadata
            .find_row(owner, name.as_str(), node.kind, node.parent_id)
            .await?
            .is_some()
        {
            return Err(DriveError::NameExists(format!("'{}'", name.as_str())));
        }

        self.metadata
            .rename_node(owner, id, name.as_str())
            .await
            .map_err(|e| match e {
                MetadataError::AlreadyExists(_) => {
                    DriveError::NameExists(format!("'{}'", name.as_str()))
                }
                MetadataError::NotFound(_) => DriveError::NotFound(format!("node {id}")),
                other => other.into(),
            })?;

        tracing::info!(node_id = id, from = %node.name, to = %name.as_str(), "Node renamed");
        Ok(())
    }
}
