//! Statements shared by pool-backed repositories and open transactions.
//!
//! Each function takes a bare connection so the same SQL runs against either a
//! pooled connection or the connection owned by a [`sqlx::Transaction`].

use crate::error::{MetadataError, MetadataResult};
use crate::models::{ChildRow, FileContentRow, NewFileContent, NewNode, NodeRow};
use larder_core::NodeKind;
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use uuid::Uuid;

/// SQLite caps bound parameters at 999; leave room for the fixed ones.
pub(crate) const MAX_IN_PARAMS: usize = 900;

pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) async fn get_node(
    conn: &mut SqliteConnection,
    id: i64,
) -> MetadataResult<Option<NodeRow>> {
    let row = sqlx::query_as::<_, NodeRow>("SELECT * FROM nodes WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub(crate) async fn find_row(
    conn: &mut SqliteConnection,
    owner: Uuid,
    name: &str,
    kind: NodeKind,
    parent: Option<i64>,
) -> MetadataResult<Option<NodeRow>> {
    let row = sqlx::query_as::<_, NodeRow>(
        "SELECT * FROM nodes WHERE owner_id = ? AND parent_id IS ? AND name = ? AND kind = ?",
    )
    .bind(owner)
    .bind(parent)
    .bind(name)
    .bind(kind.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn list_children(
    conn: &mut SqliteConnection,
    owner: Uuid,
    parent: Option<i64>,
) -> MetadataResult<Vec<ChildRow>> {
    let rows = sqlx::query_as::<_, ChildRow>(
        r#"
        SELECT n.id, n.owner_id, n.name, n.kind, n.parent_id, n.created_at, n.updated_at,
               c.id AS content_id, c.path AS content_path, c.extension,
               c.size_bytes, c.is_chunked
        FROM nodes n
        LEFT JOIN file_contents c ON c.node_id = n.id
        WHERE n.owner_id = ? AND n.parent_id IS ?
        ORDER BY CASE n.kind WHEN 'directory' THEN 0 ELSE 1 END, n.name, n.id
        "#,
    )
    .bind(owner)
    .bind(parent)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub(crate) async fn subtree_ids(
    conn: &mut SqliteConnection,
    owner: Uuid,
    root: i64,
) -> MetadataResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        WITH RECURSIVE subtree(id) AS (
            SELECT id FROM nodes WHERE id = ?1 AND owner_id = ?2
            UNION
            SELECT n.id FROM nodes n JOIN subtree s ON n.parent_id = s.id
            WHERE n.owner_id = ?2
        )
        SELECT id FROM subtree ORDER BY id
        "#,
    )
    .bind(root)
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

pub(crate) async fn ancestor_ids(
    conn: &mut SqliteConnection,
    owner: Uuid,
    node: i64,
) -> MetadataResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        WITH RECURSIVE chain(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM nodes WHERE id = ?1 AND owner_id = ?2
            UNION
            SELECT n.id, n.parent_id, c.depth + 1 FROM nodes n JOIN chain c ON n.id = c.parent_id
            WHERE n.owner_id = ?2
        )
        SELECT id FROM chain WHERE id != ?1 ORDER BY depth
        "#,
    )
    .bind(node)
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

pub(crate) async fn subtree_blob_paths(
    conn: &mut SqliteConnection,
    owner: Uuid,
    root: i64,
) -> MetadataResult<Vec<String>> {
    let paths = sqlx::query_scalar::<_, String>(
        r#"
        WITH RECURSIVE subtree(id) AS (
            SELECT id FROM nodes WHERE id = ?1 AND owner_id = ?2
            UNION
            SELECT n.id FROM nodes n JOIN subtree s ON n.parent_id = s.id
            WHERE n.owner_id = ?2
        )
        SELECT c.path FROM file_contents c
        JOIN subtree s ON c.node_id = s.id
        WHERE c.path IS NOT NULL
        UNION ALL
        SELECT k.path FROM chunks k
        JOIN file_contents c ON k.content_id = c.id
        JOIN subtree s ON c.node_id = s.id
        "#,
    )
    .bind(root)
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;
    Ok(paths)
}

/// Delete nodes by id along with their contents and chunks. Returns nodes removed.
///
/// Runs inside the caller's transaction; parent references are checked at commit.
pub(crate) async fn delete_nodes(conn: &mut SqliteConnection, ids: &[i64]) -> MetadataResult<u64> {
    let mut removed = 0;
    for batch in ids.chunks(MAX_IN_PARAMS) {
        let marks = placeholders(batch.len());

        let sql = format!(
            "DELETE FROM chunks WHERE content_id IN \
             (SELECT id FROM file_contents WHERE node_id IN ({marks}))"
        );
        let mut query = sqlx::query(&sql);
        for id in batch {
            query = query.bind(id);
        }
        query.execute(&mut *conn).await?;

        let sql = format!("DELETE FROM file_contents WHERE node_id IN ({marks})");
        let mut query = sqlx::query(&sql);
        for id in batch {
            query = query.bind(id);
        }
        query.execute(&mut *conn).await?;

        let sql = format!("DELETE FROM nodes WHERE id IN ({marks})");
        let mut query = sqlx::query(&sql);
        for id in batch {
            query = query.bind(id);
        }
        removed += query.execute(&mut *conn).await?.rows_affected();
    }
    Ok(removed)
}

pub(crate) async fn count_owned(
    conn: &mut SqliteConnection,
    owner: Uuid,
    ids: &[i64],
) -> MetadataResult<i64> {
    let mut total = 0;
    for batch in ids.chunks(MAX_IN_PARAMS) {
        let sql = format!(
            "SELECT COUNT(*) FROM nodes WHERE owner_id = ? AND id IN ({})",
            placeholders(batch.len())
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(owner);
        for id in batch {
            query = query.bind(id);
        }
        total += query.fetch_one(&mut *conn).await?;
    }
    Ok(total)
}

pub(crate) async fn batch_relocate(
    conn: &mut SqliteConnection,
    owner: Uuid,
    new_parent: Option<i64>,
    ids: &[i64],
) -> MetadataResult<u64> {
    let now = OffsetDateTime::now_utc();
    let mut moved = 0;
    for batch in ids.chunks(MAX_IN_PARAMS) {
        let sql = format!(
            "UPDATE nodes SET parent_id = ?, updated_at = ? WHERE owner_id = ? AND id IN ({})",
            placeholders(batch.len())
        );
        let mut query = sqlx::query(&sql).bind(new_parent).bind(now).bind(owner);
        for id in batch {
            query = query.bind(id);
        }

        let result = query.execute(&mut *conn).await.map_err(|e| {
            MetadataError::from_unique(e, || match new_parent {
                Some(parent) => format!("name collision under node {parent}"),
                None => "name collision at root".to_string(),
            })
        })?;
        moved += result.rows_affected();
    }
    Ok(moved)
}

pub(crate) async fn insert_node(
    conn: &mut SqliteConnection,
    node: &NewNode,
) -> MetadataResult<NodeRow> {
    let now = OffsetDateTime::now_utc();
    let row = sqlx::query_as::<_, NodeRow>(
        r#"
        INSERT INTO nodes (owner_id, name, kind, parent_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(node.owner_id)
    .bind(&node.name)
    .bind(node.kind.as_str())
    .bind(node.parent_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| MetadataError::from_unique(e, || format!("{} '{}'", node.kind, node.name)))?;
    Ok(row)
}

pub(crate) async fn insert_content(
    conn: &mut SqliteConnection,
    content: &NewFileContent,
) -> MetadataResult<FileContentRow> {
    let row = sqlx::query_as::<_, FileContentRow>(
        r#"
        INSERT INTO file_contents (node_id, path, extension, size_bytes, is_chunked, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(content.node_id)
    .bind(&content.path)
    .bind(&content.extension)
    .bind(content.size_bytes)
    .bind(content.is_chunked)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        MetadataError::from_unique(e, || format!("content for node {}", content.node_id))
    })?;
    Ok(row)
}

pub(crate) async fn complete_chunked_content(
    conn: &mut SqliteConnection,
    content_id: i64,
    path: &str,
    size_bytes: i64,
) -> MetadataResult<()> {
    let result = sqlx::query(
        "UPDATE file_contents SET path = ?, size_bytes = ? \
         WHERE id = ? AND is_chunked = 1 AND path IS NULL",
    )
    .bind(path)
    .bind(size_bytes)
    .bind(content_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(MetadataError::NotFound(format!(
            "pending chunked content {content_id}"
        )));
    }
    Ok(())
}

pub(crate) async fn delete_chunks(
    conn: &mut SqliteConnection,
    content_id: i64,
) -> MetadataResult<u64> {
    let result = sqlx::query("DELETE FROM chunks WHERE content_id = ?")
        .bind(content_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
