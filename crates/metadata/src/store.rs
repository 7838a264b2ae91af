//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::queries;
use crate::repos::{CatalogRepo, CatalogTx, ChunkRepo, FileContentRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: CatalogRepo + FileContentRepo + ChunkRepo + Send + Sync {
    /// Apply the schema. Safe to run on every start.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Open a unit of work.
    async fn begin(&self) -> MetadataResult<Box<dyn CatalogTx>>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the catalog at `path` and apply the schema.
    ///
    /// `:memory:` opens a private in-memory catalog that lives as long as the store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let in_memory = path.as_os_str() == ":memory:";

        let base = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        };
        let opts = base
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let mut pool_opts = SqlitePoolOptions::new()
            // One connection serializes writers and keeps "database is locked" away.
            .max_connections(1);
        if in_memory {
            // The database disappears with its connection.
            pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_opts.connect_with(opts).await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "sqlite catalog ready");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> MetadataResult<Box<dyn CatalogTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteCatalogTx { tx }))
    }
}

/// Transaction handed out by [`SqliteStore::begin`].
pub struct SqliteCatalogTx {
    tx: Transaction<'static, Sqlite>,
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use larder_core::NodeKind;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl CatalogRepo for SqliteStore {
        async fn create_directory(
            &self,
            owner: Uuid,
            name: &str,
            parent: Option<i64>,
        ) -> MetadataResult<NodeRow> {
            let mut tx = self.pool.begin().await?;

            if let Some(parent_id) = parent {
                let parent_row = queries::get_node(&mut tx, parent_id).await?;
                match parent_row {
                    Some(row) if row.is_owned_by(owner) && row.is_directory() => {}
                    _ => {
                        return Err(MetadataError::NotFound(format!(
                            "parent directory {parent_id}"
                        )));
                    }
                }
            }

            if queries::find_row(&mut tx, owner, name, NodeKind::Directory, parent)
                .await?
                .is_some()
            {
                return Err(MetadataError::AlreadyExists(format!("directory '{name}'")));
            }

            let row = queries::insert_node(
                &mut tx,
                &NewNode {
                    owner_id: owner,
                    name: name.to_string(),
                    kind: NodeKind::Directory,
                    parent_id: parent,
                },
            )
            .await?;

            tx.commit().await?;
            Ok(row)
        }

        async fn find_row(
            &self,
            owner: Uuid,
            name: &str,
            kind: NodeKind,
            parent: Option<i64>,
        ) -> MetadataResult<Option<NodeRow>> {
            let mut conn = self.pool.acquire().await?;
            queries::find_row(&mut conn, owner, name, kind, parent).await
        }

        async fn get_node(&self, id: i64) -> MetadataResult<Option<NodeRow>> {
            let mut conn = self.pool.acquire().await?;
            queries::get_node(&mut conn, id).await
        }

        async fn get_owned_node(&self, owner: Uuid, id: i64) -> MetadataResult<Option<NodeRow>> {
            let row = sqlx::query_as::<_, NodeRow>(
                "SELECT * FROM nodes WHERE id = ? AND owner_id = ?",
            )
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_children(
            &self,
            owner: Uuid,
            parent: Option<i64>,
        ) -> MetadataResult<Vec<ChildRow>> {
            let mut conn = self.pool.acquire().await?;
            queries::list_children(&mut conn, owner, parent).await
        }

        async fn subtree_ids(&self, owner: Uuid, root: i64) -> MetadataResult<Vec<i64>> {
            let mut conn = self.pool.acquire().await?;
            queries::subtree_ids(&mut conn, owner, root).await
        }

        async fn ancestor_ids(&self, owner: Uuid, node: i64) -> MetadataResult<Vec<i64>> {
            let mut conn = self.pool.acquire().await?;
            queries::ancestor_ids(&mut conn, owner, node).await
        }

        async fn subtree_blob_paths(
            &self,
            owner: Uuid,
            root: i64,
        ) -> MetadataResult<Vec<String>> {
            let mut conn = self.pool.acquire().await?;
            queries::subtree_blob_paths(&mut conn, owner, root).await
        }

        async fn delete_subtree(&self, owner: Uuid, root: i64) -> MetadataResult<u64> {
            let mut tx = self.pool.begin().await?;
            let ids = queries::subtree_ids(&mut tx, owner, root).await?;
            let removed = queries::delete_nodes(&mut tx, &ids).await?;
            tx.commit().await?;
            Ok(removed)
        }

        async fn rename_node(&self, owner: Uuid, id: i64, name: &str) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE nodes SET name = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
            )
            .bind(name)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| MetadataError::from_unique(e, || format!("sibling named '{name}'")))?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("node {id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FileContentRepo for SqliteStore {
        async fn get_content(&self, id: i64) -> MetadataResult<Option<FileContentRow>> {
            let row = sqlx::query_as::<_, FileContentRow>("SELECT * FROM file_contents WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_content_for_node(
            &self,
            node_id: i64,
        ) -> MetadataResult<Option<FileContentRow>> {
            let row = sqlx::query_as::<_, FileContentRow>(
                "SELECT * FROM file_contents WHERE node_id = ?",
            )
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn max_content_id(&self) -> MetadataResult<i64> {
            let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM file_contents")
                .fetch_one(&self.pool)
                .await?;
            Ok(max)
        }

        async fn used_bytes(&self, owner: Uuid) -> MetadataResult<i64> {
            let used: i64 = sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(c.size_bytes), 0)
                FROM file_contents c
                JOIN nodes n ON n.id = c.node_id
                WHERE n.owner_id = ? AND n.kind = 'file'
                "#,
            )
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
            Ok(used)
        }
    }

    #[async_trait]
    impl ChunkRepo for SqliteStore {
        async fn record_chunk(&self, chunk: &NewChunk) -> MetadataResult<ChunkRow> {
            let row = sqlx::query_as::<_, ChunkRow>(
                r#"
                INSERT INTO chunks (content_id, chunk_number, path, size_bytes, created_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(chunk.content_id)
            .bind(chunk.chunk_number)
            .bind(&chunk.path)
            .bind(chunk.size_bytes)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                MetadataError::from_unique(e, || {
                    format!("chunk {} of content {}", chunk.chunk_number, chunk.content_id)
                })
            })?;
            Ok(row)
        }

        async fn get_chunk(
            &self,
            content_id: i64,
            chunk_number: i64,
        ) -> MetadataResult<Option<ChunkRow>> {
            let row = sqlx::query_as::<_, ChunkRow>(
                "SELECT * FROM chunks WHERE content_id = ? AND chunk_number = ?",
            )
            .bind(content_id)
            .bind(chunk_number)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_chunks(&self, content_id: i64) -> MetadataResult<Vec<ChunkRow>> {
            let rows = sqlx::query_as::<_, ChunkRow>(
                "SELECT * FROM chunks WHERE content_id = ? ORDER BY chunk_number",
            )
            .bind(content_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn chunk_range(&self, content_id: i64) -> MetadataResult<Option<ChunkRange>> {
            let range = sqlx::query_as::<_, ChunkRange>(
                r#"
                SELECT MIN(chunk_number) AS min_chunk,
                       MAX(chunk_number) AS max_chunk,
                       COUNT(*) AS chunk_count,
                       COALESCE(SUM(size_bytes), 0) AS total_size
                FROM chunks
                WHERE content_id = ?
                HAVING COUNT(*) > 0
                "#,
            )
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(range)
        }
    }

    #[async_trait]
    impl CatalogTx for SqliteCatalogTx {
        async fn get_node(&mut self, id: i64) -> MetadataResult<Option<NodeRow>> {
            queries::get_node(&mut self.tx, id).await
        }

        async fn find_row(
            &mut self,
            owner: Uuid,
            name: &str,
            kind: NodeKind,
            parent: Option<i64>,
        ) -> MetadataResult<Option<NodeRow>> {
            queries::find_row(&mut self.tx, owner, name, kind, parent).await
        }

        async fn count_owned(&mut self, owner: Uuid, ids: &[i64]) -> MetadataResult<i64> {
            queries::count_owned(&mut self.tx, owner, ids).await
        }

        async fn batch_relocate(
            &mut self,
            owner: Uuid,
            new_parent: Option<i64>,
            ids: &[i64],
        ) -> MetadataResult<u64> {
            queries::batch_relocate(&mut self.tx, owner, new_parent, ids).await
        }

        async fn insert_node(&mut self, node: &NewNode) -> MetadataResult<NodeRow> {
            queries::insert_node(&mut self.tx, node).await
        }

        async fn insert_content(
            &mut self,
            content: &NewFileContent,
        ) -> MetadataResult<FileContentRow> {
            queries::insert_content(&mut self.tx, content).await
        }

        async fn complete_chunked_content(
            &mut self,
            content_id: i64,
            path: &str,
            size_bytes: i64,
        ) -> MetadataResult<()> {
            queries::complete_chunked_content(&mut self.tx, content_id, path, size_bytes).await
        }

        async fn delete_chunks(&mut self, content_id: i64) -> MetadataResult<u64> {
            queries::delete_chunks(&mut self.tx, content_id).await
        }

        async fn commit(self: Box<Self>) -> MetadataResult<()> {
            self.tx.commit().await?;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> MetadataResult<()> {
            self.tx.rollback().await?;
            Ok(())
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Directory and file nodes; parent_id NULL means the owner's root
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id BLOB NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('directory', 'file')),
    parent_id INTEGER REFERENCES nodes(id) DEFERRABLE INITIALLY DEFERRED,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (parent_id IS NULL OR parent_id != id)
);
CREATE INDEX IF NOT EXISTS idx_nodes_owner_parent ON nodes(owner_id, parent_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_unique_name
    ON nodes(owner_id, COALESCE(parent_id, 0), name, kind);

-- Content of file nodes; path stays NULL until a chunked upload is reassembled
CREATE TABLE IF NOT EXISTS file_contents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id INTEGER NOT NULL UNIQUE REFERENCES nodes(id) ON DELETE CASCADE,
    path TEXT,
    extension TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    is_chunked INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Parts of chunked uploads
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id INTEGER NOT NULL REFERENCES file_contents(id) ON DELETE CASCADE,
    chunk_number INTEGER NOT NULL,
    path TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (content_id, chunk_number)
);
"#;
