//! Direct and chunked uploads.

use crate::drive::{Drive, UploadLimits};
use crate::error::{DriveError, DriveResult};
use crate::source::UploadSource;
use crate::tree::{ChunkInfo, TreeEntry};
use bytes::Bytes;
use futures::StreamExt;
use larder_core::{NodeKind, UploadHandle, blob_key, chunk_key};
use larder_metadata::MetadataError;
use larder_metadata::models::{ChunkRow, FileContentRow, NewChunk, NewFileContent, NewNode, NodeRow};
use larder_storage::StreamingUpload;
use tokio::io::AsyncReadExt;
use tracing::instrument;
use uuid::Uuid;

/// Read buffer for copying a source into the blob store.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Random tail that keeps blob and chunk keys unique between concurrent writers.
fn key_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(12);
    suffix
}

async fn abort_upload(key: &str, upload: Box<dyn StreamingUpload>) {
    if let Err(e) = upload.abort().await {
        tracing::warn!(key = %key, error = %e, "Failed to abort upload");
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Drive {
    /// Store a file in one pass and return the listing of its directory.
    ///
    /// Nothing reaches the catalog unless the blob was written completely. A source
    /// without a declared length is measured first, so it must also be able to rewind.
    #[instrument(skip(self, source, limits), fields(owner = %owner))]
    pub async fn upload_file(
        &self,
        owner: Uuid,
        parent: Option<i64>,
        filename: &str,
        source: &mut dyn UploadSource,
        limits: UploadLimits,
    ) -> DriveResult<Vec<TreeEntry>> {
        self.require_parent(owner, parent).await?;

        let ceiling = self.config.direct_upload_ceiling;
        let size = match source.declared_len() {
            Some(len) => len,
            None => {
                let bound = limits.max_size.min(ceiling).saturating_add(1);
                tokio::io::copy(&mut (&mut *source).take(bound), &mut tokio::io::sink())
                    .await
                    .map_err(DriveError::read_failed)?
            }
        };

        if size > ceiling {
            return Err(DriveError::UseChunkedUpload {
                size,
                limit: ceiling,
            });
        }
        if size > limits.max_size {
            return Err(DriveError::TooLarge {
                size,
                limit: limits.max_size,
            });
        }

        self.quota.enforce(owner, size, limits.quota).await?;

        if !source.rewind().await.map_err(DriveError::read_failed)? {
            return Err(DriveError::NotSeekable);
        }

        let name = self.available_filename(owner, parent, filename).await?;
        let extension = name.extension();

        let seq = self.metadata.max_content_id().await? + 1;
        let key = blob_key(seq.unsigned_abs(), &key_suffix());
        let written = self.write_source(&key, source, size).await?;

        let node = NewNode {
            owner_id: owner,
            name: name.as_str().to_string(),
            kind: NodeKind::File,
            parent_id: parent,
        };
        let content = |node_id| NewFileContent {
            node_id,
            path: Some(key.clone()),
            extension: extension.clone(),
            size_bytes: to_i64(written),
            is_chunked: false,
        };

        match self.insert_file(&node, content).await {
            Ok((node, _)) => {
                tracing::info!(
                    node_id = node.id,
                    key = %key,
                    size_bytes = written,
                    "File uploaded"
                );
            }
            Err(e) => {
                self.discard_blob(&key).await;
                return Err(match e {
                    MetadataError::AlreadyExists(_) => DriveError::FilenameExists(node.name),
                    other => other.into(),
                });
            }
        }

        self.get_tree(owner, parent).await
    }

    /// Register a file whose bytes will arrive as numbered chunks.
    ///
    /// Runs the same validation as a direct upload against `declared_size`, then
    /// creates the file with pending content. No bytes move.
    #[instrument(skip(self, limits), fields(owner = %owner))]
    pub async fn prepare_chunked_upload(
        &self,
        owner: Uuid,
        parent: Option<i64>,
        filename: &str,
        declared_size: u64,
        limits: UploadLimits,
    ) -> DriveResult<UploadHandle> {
        self.require_parent(owner, parent).await?;

        if declared_size > limits.max_size {
            return Err(DriveError::TooLarge {
                size: declared_size,
                limit: limits.max_size,
            });
        }

        self.quota.enforce(owner, declared_size, limits.quota).await?;

        let name = self.available_filename(owner, parent, filename).await?;
        let extension = name.extension();

        let node = NewNode {
            owner_id: owner,
            name: name.into_string(),
            kind: NodeKind::File,
            parent_id: parent,
        };
        let content = |node_id| NewFileContent {
            node_id,
            path: None,
            extension: extension.clone(),
            size_bytes: 0,
            is_chunked: true,
        };

        let (node, content) = self.insert_file(&node, content).await.map_err(|e| match e {
            MetadataError::AlreadyExists(_) => DriveError::FilenameExists(node.name.clone()),
            other => other.into(),
        })?;

        tracing::info!(
            node_id = node.id,
            content_id = content.id,
            declared_size,
            "Chunked upload prepared"
        );
        Ok(UploadHandle::new(content.id))
    }

    /// Store one numbered part of a chunked upload.
    #[instrument(skip(self, data), fields(owner = %owner, size = data.len()))]
    pub async fn append_chunk(
        &self,
        owner: Uuid,
        handle: UploadHandle,
        chunk_number: u32,
        data: Bytes,
    ) -> DriveResult<ChunkRow> {
        let (_, content) = self.pending_content(owner, handle).await?;

        if self
            .metadata
            .get_chunk(content.id, i64::from(chunk_number))
            .await?
            .is_some()
        {
            return Err(DriveError::ChunkExists(chunk_number));
        }

        let received = self
            .metadata
            .chunk_range(content.id)
            .await?
            .map(|r| u64::try_from(r.total_size).unwrap_or(0))
            .unwrap_or(0);
        let size = data.len() as u64;
        if received.saturating_add(size) > self.config.max_upload_bytes {
            return Err(DriveError::TooLarge {
                size: received.saturating_add(size),
                limit: self.config.max_upload_bytes,
            });
        }

        let key = chunk_key(content.id.unsigned_abs(), chunk_number, &key_suffix());
        self.storage
            .put(&key, data)
            .await
            .map_err(|e| DriveError::save_failed(&key, e))?;

        let recorded = self
            .metadata
            .record_chunk(&NewChunk {
                content_id: content.id,
                chunk_number: i64::from(chunk_number),
                path: key.clone(),
                size_bytes: to_i64(size),
            })
            .await;

        match recorded {
            Ok(row) => {
                tracing::debug!(content_id = content.id, chunk_number, "Chunk stored");
                Ok(row)
            }
            // Another writer recorded this number first; its row points at its own key.
            Err(MetadataError::AlreadyExists(_)) => {
                self.discard_blob(&key).await;
                Err(DriveError::ChunkExists(chunk_number))
            }
            Err(e) => {
                self.discard_blob(&key).await;
                Err(e.into())
            }
        }
    }

    /// Received range of a chunked upload.
    pub async fn chunk_info(&self, owner: Uuid, handle: UploadHandle) -> DriveResult<ChunkInfo> {
        let content = self.owned_content(owner, handle).await?;
        let info = match self.metadata.chunk_range(content.id).await? {
            Some(range) => ChunkInfo {
                min: u32::try_from(range.min_chunk).ok(),
                max: u32::try_from(range.max_chunk).ok(),
                count: u64::try_from(range.chunk_count).unwrap_or(0),
                total_size: u64::try_from(range.total_size).unwrap_or(0),
            },
            None => ChunkInfo::default(),
        };
        Ok(info)
    }

    /// Join the received chunks into the final blob and mark the file complete.
    ///
    /// Part blobs are removed only after the catalog points at the joined blob.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn finalize_chunked_upload(
        &self,
        owner: Uuid,
        handle: UploadHandle,
        quota: u64,
    ) -> DriveResult<Vec<TreeEntry>> {
        let (node, content) = self.pending_content(owner, handle).await?;

        let range = self
            .metadata
            .chunk_range(content.id)
            .await?
            .filter(|r| r.min_chunk == 0 && r.is_contiguous())
            .ok_or(DriveError::ChunksNotContiguous)?;

        let total = u64::try_from(range.total_size).unwrap_or(0);
        if total > self.config.max_upload_bytes {
            return Err(DriveError::TooLarge {
                size: total,
                limit: self.config.max_upload_bytes,
            });
        }
        self.quota.enforce(owner, total, quota).await?;

        let chunks = self.metadata.list_chunks(content.id).await?;
        let key = blob_key(content.id.unsigned_abs(), &key_suffix());
        let written = self.join_chunks(&key, &chunks).await?;

        let completed = async {
            let mut tx = self.metadata.begin().await?;
            tx.complete_chunked_content(content.id, &key, to_i64(written))
                .await?;
            tx.delete_chunks(content.id).await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = completed {
            self.discard_blob(&key).await;
            return Err(match e {
                MetadataError::NotFound(_) => DriveError::UploadAlreadyComplete,
                other => other.into(),
            });
        }

        for chunk in &chunks {
            self.discard_blob(&chunk.path).await;
        }

        tracing::info!(
            node_id = node.id,
            content_id = content.id,
            key = %key,
            size_bytes = written,
            chunks = chunks.len(),
            "Chunked upload finalized"
        );
        self.get_tree(owner, node.parent_id).await
    }

    /// Insert a file node and its content in one unit of work.
    async fn insert_file(
        &self,
        node: &NewNode,
        content: impl FnOnce(i64) -> NewFileContent + Send,
    ) -> Result<(NodeRow, FileContentRow), MetadataError> {
        let mut tx = self.metadata.begin().await?;
        let node = tx.insert_node(node).await?;
        let content = tx.insert_content(&content(node.id)).await?;
        tx.commit().await?;
        Ok((node, content))
    }

    /// Copy at most `size` bytes of `source` into a new blob.
    async fn write_source(
        &self,
        key: &str,
        source: &mut dyn UploadSource,
        size: u64,
    ) -> DriveResult<u64> {
        let mut upload = self
            .storage
            .put_stream(key)
            .await
            .map_err(|e| DriveError::save_failed(key, e))?;

        let mut reader = (&mut *source).take(size);
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    abort_upload(key, upload).await;
                    return Err(DriveError::read_failed(e));
                }
            };
            if let Err(e) = upload.write(Bytes::copy_from_slice(&buf[..n])).await {
                abort_upload(key, upload).await;
                return Err(DriveError::save_failed(key, e));
            }
        }

        upload
            .finish()
            .await
            .map_err(|e| DriveError::save_failed(key, e))
    }

    /// Stream every chunk, in order, into a new blob.
    async fn join_chunks(&self, key: &str, chunks: &[ChunkRow]) -> DriveResult<u64> {
        let mut upload = self
            .storage
            .put_stream(key)
            .await
            .map_err(|e| DriveError::save_failed(key, e))?;

        for chunk in chunks {
            let mut parts = match self.storage.get_stream(&chunk.path).await {
                Ok(stream) => stream,
                Err(e) => {
                    abort_upload(key, upload).await;
                    return Err(DriveError::fetch_failed(&chunk.path, e));
                }
            };
            while let Some(part) = parts.next().await {
                let written = match part {
                    Ok(bytes) => upload.write(bytes).await,
                    Err(e) => {
                        abort_upload(key, upload).await;
                        return Err(DriveError::fetch_failed(&chunk.path, e));
                    }
                };
                if let Err(e) = written {
                    abort_upload(key, upload).await;
                    return Err(DriveError::save_failed(key, e));
                }
            }
        }

        upload
            .finish()
            .await
            .map_err(|e| DriveError::save_failed(key, e))
    }

    /// Content behind `handle`, if the handle's file belongs to `owner`.
    async fn owned_content(&self, owner: Uuid, handle: UploadHandle) -> DriveResult<FileContentRow> {
        let not_found = || DriveError::NotFound(format!("upload {handle}"));
        let content = self
            .metadata
            .get_content(handle.content_id())
            .await?
            .ok_or_else(not_found)?;
        self.owned_node(owner, content.node_id)
            .await?
            .ok_or_else(not_found)?;
        Ok(content)
    }

    /// Like [`Drive::owned_content`], but the upload must still be pending.
    async fn pending_content(
        &self,
        owner: Uuid,
        handle: UploadHandle,
    ) -> DriveResult<(NodeRow, FileContentRow)> {
        let content = self.owned_content(owner, handle).await?;
        if !content.is_pending() {
            return Err(DriveError::UploadAlreadyComplete);
        }
        let node = self
            .owned_node(owner, content.node_id)
            .await?
            .ok_or_else(|| DriveError::NotFound(format!("upload {handle}")))?;
        Ok((node, content))
    }
}
