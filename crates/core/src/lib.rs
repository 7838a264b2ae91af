//! Core domain types and shared rules for the larder drive engine.
//!
//! This crate defines the vocabulary used across all other crates:
//! - Node kinds in the per-owner namespace
//! - Filename sanitizing and extension derivation
//! - Blob key sharding for stored content and chunk parts
//! - Upload handles for chunked uploads
//! - Configuration for storage, metadata and drive limits

pub mod config;
pub mod error;
pub mod naming;
pub mod node;
pub mod shard;
pub mod upload;

pub use error::{Error, Result};
pub use naming::{SafeName, extension_of, sanitize_name};
pub use node::NodeKind;
pub use shard::{blob_key, chunk_key, shard_dir};
pub use upload::UploadHandle;

/// Default per-owner quota: 10 GiB
pub const DEFAULT_QUOTA_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Default maximum size of a single file: 5 GiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Largest payload accepted on the direct upload path: 100 MiB
pub const DEFAULT_DIRECT_UPLOAD_CEILING: u64 = 100 * 1024 * 1024;

/// Node ids relocated per statement during a bulk move.
pub const DEFAULT_MOVE_BATCH_SIZE: usize = 100;

/// Maximum length of a node name in bytes.
pub const MAX_NAME_LEN: usize = 255;
