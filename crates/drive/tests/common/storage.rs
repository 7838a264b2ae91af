//! Blob store test utilities.

use larder_storage::{BlobStore, FilesystemBackend, StorageResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A filesystem blob store in a temporary directory.
#[allow(dead_code)]
pub struct TestStorage {
    pub backend: Arc<FilesystemBackend>,
    root: PathBuf,
    _temp_dir: TempDir,
}

impl TestStorage {
    pub async fn new() -> StorageResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = temp_dir.path().join("blobs");
        let backend = Arc::new(FilesystemBackend::new(&root).await?);

        Ok(Self {
            backend,
            root,
            _temp_dir: temp_dir,
        })
    }

    pub fn store(&self) -> Arc<dyn BlobStore> {
        self.backend.clone()
    }

    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative keys of every stored blob, sorted.
    #[allow(dead_code)]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_files(&self.root, &self.root, &mut keys);
        keys.sort();
        keys
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
