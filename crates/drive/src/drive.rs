//! The drive engine.

use crate::error::{DriveError, DriveResult};
use crate::quota::QuotaAccountant;
use crate::tree::{FileDownload, SpaceReport, TreeEntry};
use larder_core::config::DriveConfig;
use larder_core::{NodeKind, SafeName, sanitize_name};
use larder_metadata::models::NodeRow;
use larder_metadata::{MetadataError, MetadataStore};
use larder_storage::BlobStore;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Size limits applied to one upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest accepted file.
    pub max_size: u64,
    /// The owner's quota ceiling.
    pub quota: u64,
}

impl From<&DriveConfig> for UploadLimits {
    fn from(config: &DriveConfig) -> Self {
        Self {
            max_size: config.max_upload_bytes,
            quota: config.quota_bytes,
        }
    }
}

/// Per-owner drive operations over a catalog and a blob store.
///
/// Every operation takes the authenticated owner. Nodes of other owners are
/// indistinguishable from missing ones.
#[derive(Clone)]
pub struct Drive {
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) storage: Arc<dyn BlobStore>,
    pub(crate) quota: QuotaAccountant,
    pub(crate) config: DriveConfig,
}

impl Drive {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn BlobStore>,
        config: DriveConfig,
    ) -> Self {
        Self {
            quota: QuotaAccountant::new(metadata.clone()),
            metadata,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Limits derived from configuration.
    pub fn default_limits(&self) -> UploadLimits {
        UploadLimits::from(&self.config)
    }

    pub fn quota(&self) -> &QuotaAccountant {
        &self.quota
    }

    /// Check the catalog and the blob store.
    pub async fn health_check(&self) -> DriveResult<()> {
        self.metadata.health_check().await?;
        self.storage
            .health_check()
            .await
            .map_err(|e| DriveError::fetch_failed(self.storage.backend_name(), e))
    }

    /// Create a directory and return the listing of its parent.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn create_directory(
        &self,
        owner: Uuid,
        name: &str,
        parent: Option<i64>,
    ) -> DriveResult<Vec<TreeEntry>> {
        let name = sanitize_name(name)?;

        let node = self
            .metadata
            .create_directory(owner, name.as_str(), parent)
            .await
            .map_err(|e| match e {
                MetadataError::NotFound(_) => DriveError::ParentNotFound,
                MetadataError::AlreadyExists(_) => {
                    DriveError::DirectoryExists(name.as_str().to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(node_id = node.id, name = %node.name, "Directory created");
        self.get_tree(owner, parent).await
    }

    /// Direct children of `parent`, directories first, then by name.
    ///
    /// A missing or foreign parent lists as empty.
    pub async fn get_tree(&self, owner: Uuid, parent: Option<i64>) -> DriveResult<Vec<TreeEntry>> {
        let rows = self.metadata.list_children(owner, parent).await?;
        Ok(rows.into_iter().map(TreeEntry::from).collect())
    }

    /// Open a file for reading.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn get_file(&self, owner: Uuid, id: i64) -> DriveResult<FileDownload> {
        let node = self
            .owned_node(owner, id)
            .await?
            .filter(|n| n.kind.is_file())
            .ok_or_else(|| DriveError::NotFound(format!("file {id}")))?;

        let content = self
            .metadata
            .get_content_for_node(node.id)
            .await?
            .ok_or_else(|| DriveError::NotFound(format!("file {id}")))?;

        let path = match content.path {
            Some(path) => path,
            None => return Err(DriveError::UploadIncomplete),
        };

        let stream = self
            .storage
            .get_stream(&path)
            .await
            .map_err(|e| DriveError::fetch_failed(&path, e))?;

        Ok(FileDownload {
            stream,
            original_name: node.name,
            size: u64::try_from(content.size_bytes).unwrap_or(0),
        })
    }

    /// Quota usage against `ceiling`.
    pub async fn space(&self, owner: Uuid, ceiling: u64) -> DriveResult<SpaceReport> {
        let used = self.quota.compute_used(owner).await?;
        Ok(SpaceReport {
            total: ceiling,
            used,
        })
    }

    pub(crate) async fn owned_node(&self, owner: Uuid, id: i64) -> DriveResult<Option<NodeRow>> {
        Ok(self.metadata.get_owned_node(owner, id).await?)
    }

    /// `ParentNotFound` unless `parent` is the root or an owned directory.
    pub(crate) async fn require_parent(&self, owner: Uuid, parent: Option<i64>) -> DriveResult<()> {
        let Some(parent_id) = parent else {
            return Ok(());
        };
        match self.owned_node(owner, parent_id).await? {
            Some(node) if node.is_directory() => Ok(()),
            _ => Err(DriveError::ParentNotFound),
        }
    }

    /// Sanitize a filename and make sure no file of that name exists under `parent`.
    pub(crate) async fn available_filename(
        &self,
        owner: Uuid,
        parent: Option<i64>,
        filename: &str,
    ) -> DriveResult<SafeName> {
        let name = sanitize_name(filename)?;
        let existing = self
            .metadata
            .find_row(owner, name.as_str(), NodeKind::File, parent)
            .await?;
        if existing.is_some() {
            return Err(DriveError::FilenameExists(name.into_string()));
        }
        Ok(name)
    }

    /// Best-effort blob removal; failures are logged and reported as `false`.
    pub(crate) async fn discard_blob(&self, key: &str) -> bool {
        match self.storage.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to remove blob");
                false
            }
        }
    }
}
