//! Failure-injecting blob store.

use async_trait::async_trait;
use bytes::Bytes;
use larder_storage::{
    BlobStore, ByteStream, ObjectMeta, StorageError, StorageResult, StreamingUpload,
};
use larder_metadata::MetadataStore;
use larder_metadata::models::NewChunk;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn injected(op: &str) -> StorageError {
    StorageError::Io(std::io::Error::other(format!("injected {op} failure")))
}

/// Wraps a real store and fails selected operations on demand.
#[allow(dead_code)]
pub struct FailingStore {
    inner: Arc<dyn BlobStore>,
    fail_saves: AtomicBool,
    fail_deletes: AtomicBool,
    pub save_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            save_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_stream(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(injected("put"));
        }
        self.inner.put(key, data).await
    }

    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let upload = self.inner.put_stream(key).await?;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Ok(Box::new(FailingUpload { inner: upload }));
        }
        Ok(upload)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Accepts writes, then fails on finish and discards what it got.
struct FailingUpload {
    inner: Box<dyn StreamingUpload>,
}

#[async_trait]
impl StreamingUpload for FailingUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.inner.write(data).await
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        self.inner.abort().await?;
        Err(injected("finish"))
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.inner.abort().await
    }
}

/// Before the next chunk save goes through, records a competing writer's part with
/// the same number, as if that writer had won the race past the duplicate check.
#[allow(dead_code)]
pub struct RacingStore {
    inner: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    rival: Mutex<Option<(i64, u32, Bytes)>>,
}

#[allow(dead_code)]
impl RacingStore {
    pub const RIVAL_PREFIX: &'static str = "chunks/rival";

    pub fn new(inner: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            inner,
            metadata,
            rival: Mutex::new(None),
        }
    }

    /// Arm a rival part for the next `put`.
    pub fn race_next_put(&self, content_id: i64, chunk_number: u32, data: Bytes) {
        *self.rival.lock().unwrap() = Some((content_id, chunk_number, data));
    }

    pub fn rival_key(chunk_number: u32) -> String {
        format!("{}/{chunk_number}", Self::RIVAL_PREFIX)
    }
}

#[async_trait]
impl BlobStore for RacingStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_stream(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let rival = self.rival.lock().unwrap().take();
        if let Some((content_id, chunk_number, rival_data)) = rival {
            let rival_key = Self::rival_key(chunk_number);
            let size = rival_data.len() as i64;
            self.inner.put(&rival_key, rival_data).await?;
            self.metadata
                .record_chunk(&NewChunk {
                    content_id,
                    chunk_number: i64::from(chunk_number),
                    path: rival_key,
                    size_bytes: size,
                })
                .await
                .expect("rival chunk not recorded");
        }
        self.inner.put(key, data).await
    }

    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        self.inner.put_stream(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "racing"
    }
}
