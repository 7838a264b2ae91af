//! Drive fixtures.

use super::{FailingStore, TestMetadata, TestStorage};
use futures::StreamExt;
use larder_core::config::DriveConfig;
use larder_drive::{BytesSource, Drive, DriveResult, TreeEntry, UploadLimits};
use larder_storage::{BlobStore, ByteStream};
use std::sync::Arc;
use uuid::Uuid;

/// A drive over a temporary catalog and blob store.
#[allow(dead_code)]
pub struct TestDrive {
    pub drive: Drive,
    pub metadata: TestMetadata,
    pub storage: TestStorage,
    pub failing: Option<Arc<FailingStore>>,
}

#[allow(dead_code)]
impl TestDrive {
    pub async fn new() -> Self {
        Self::with_config(DriveConfig::default()).await
    }

    pub async fn with_config(config: DriveConfig) -> Self {
        let metadata = TestMetadata::new().await.expect("Failed to create metadata");
        let storage = TestStorage::new().await.expect("Failed to create storage");
        let drive = Drive::new(metadata.store(), storage.store(), config);
        Self {
            drive,
            metadata,
            storage,
            failing: None,
        }
    }

    /// A drive whose blob store can be told to fail.
    pub async fn failing(config: DriveConfig) -> Self {
        let metadata = TestMetadata::new().await.expect("Failed to create metadata");
        let storage = TestStorage::new().await.expect("Failed to create storage");
        let failing = Arc::new(FailingStore::new(storage.store()));
        let drive = Drive::new(
            metadata.store(),
            failing.clone() as Arc<dyn BlobStore>,
            config,
        );
        Self {
            drive,
            metadata,
            storage,
            failing: Some(failing),
        }
    }

    pub fn failing_store(&self) -> &FailingStore {
        self.failing.as_deref().expect("not a failing drive")
    }

    pub fn limits(&self) -> UploadLimits {
        self.drive.default_limits()
    }

    /// Upload `data` as `name` with default limits.
    pub async fn upload(
        &self,
        owner: Uuid,
        parent: Option<i64>,
        name: &str,
        data: &[u8],
    ) -> DriveResult<Vec<TreeEntry>> {
        let mut source = BytesSource::new(data.to_vec());
        self.drive
            .upload_file(owner, parent, name, &mut source, self.limits())
            .await
    }

    /// Create a directory and return its id.
    pub async fn mkdir(&self, owner: Uuid, parent: Option<i64>, name: &str) -> i64 {
        let listing = self
            .drive
            .create_directory(owner, name, parent)
            .await
            .expect("mkdir failed");
        entry(&listing, name).id
    }

    /// Parent of a node, straight from the catalog.
    pub async fn parent_of(&self, id: i64) -> Option<i64> {
        self.metadata
            .store
            .get_node(id)
            .await
            .expect("get_node failed")
            .expect("node missing")
            .parent_id
    }
}

#[allow(dead_code)]
pub fn owner() -> Uuid {
    Uuid::new_v4()
}

/// Deterministic payload of `len` bytes.
#[allow(dead_code)]
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Find a listing entry by name.
#[allow(dead_code)]
pub fn entry<'a>(listing: &'a [TreeEntry], name: &str) -> &'a TreeEntry {
    listing
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no entry named {name} in {listing:?}"))
}

#[allow(dead_code)]
pub async fn read_all(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.expect("stream error"));
    }
    out
}
