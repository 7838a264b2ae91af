//! Relational catalog for larder drives.
//!
//! This crate owns the persistent data model:
//! - Directory and file nodes, keyed by parent pointer
//! - File contents (one blob, or a sequence of chunks)
//! - Chunk records for multi-part uploads
//! - Transactional units of work for multi-step mutations

pub mod error;
pub mod models;
mod queries;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use repos::{CatalogRepo, CatalogTx, ChunkRepo, FileContentRepo};
pub use store::{MetadataStore, SqliteCatalogTx, SqliteStore};

use larder_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
