//! Metadata store test utilities.

use larder_core::NodeKind;
use larder_metadata::models::{FileContentRow, NewFileContent, NewNode, NodeRow};
use larder_metadata::{MetadataResult, MetadataStore, SqliteStore};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// A test metadata store wrapper that cleans up on drop.
#[allow(dead_code)]
pub struct TestMetadata {
    pub store: Arc<dyn MetadataStore>,
    pub(crate) sqlite_store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

impl TestMetadata {
    /// Create a new test catalog in a temporary file.
    pub async fn new() -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("catalog.db");
        let store = Arc::new(SqliteStore::new(&db_path).await?);

        Ok(Self {
            store: store.clone(),
            sqlite_store: store,
            _temp_dir: temp_dir,
        })
    }

    /// Get a reference to the metadata store.
    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    /// Get a reference to the SQLite connection pool for raw queries.
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite_store.pool()
    }
}

/// Insert a file node with complete content in its own transaction.
#[allow(dead_code)]
pub async fn insert_file(
    store: &Arc<dyn MetadataStore>,
    owner: Uuid,
    parent: Option<i64>,
    name: &str,
    size: i64,
) -> (NodeRow, FileContentRow) {
    let mut tx = store.begin().await.expect("begin failed");
    let node = tx
        .insert_node(&NewNode {
            owner_id: owner,
            name: name.to_string(),
            kind: NodeKind::File,
            parent_id: parent,
        })
        .await
        .expect("insert node failed");
    let content = tx
        .insert_content(&NewFileContent {
            node_id: node.id,
            path: Some(format!("1/1/{}-test", node.id)),
            extension: larder_core::extension_of(name),
            size_bytes: size,
            is_chunked: false,
        })
        .await
        .expect("insert content failed");
    tx.commit().await.expect("commit failed");
    (node, content)
}

/// Insert a pending chunked file.
#[allow(dead_code)]
pub async fn insert_pending_file(
    store: &Arc<dyn MetadataStore>,
    owner: Uuid,
    parent: Option<i64>,
    name: &str,
) -> (NodeRow, FileContentRow) {
    let mut tx = store.begin().await.expect("begin failed");
    let node = tx
        .insert_node(&NewNode {
            owner_id: owner,
            name: name.to_string(),
            kind: NodeKind::File,
            parent_id: parent,
        })
        .await
        .expect("insert node failed");
    let content = tx
        .insert_content(&NewFileContent {
            node_id: node.id,
            path: None,
            extension: None,
            size_bytes: 0,
            is_chunked: true,
        })
        .await
        .expect("insert content failed");
    tx.commit().await.expect("commit failed");
    (node, content)
}
