//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for stored blobs.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/blobs"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.trim().is_empty() {
                    return Err("s3 config requires a non-empty bucket".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
            StorageConfig::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    return Err("filesystem storage requires a path".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path. `:memory:` opens a private in-memory catalog.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/catalog.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                Err("sqlite metadata requires a path".to_string())
            }
            MetadataConfig::Sqlite { .. } => Ok(()),
        }
    }
}

/// Drive limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Per-owner quota ceiling in bytes.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
    /// Largest file accepted on any upload path.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Largest payload accepted on the direct path; bigger files must be chunked.
    #[serde(default = "default_direct_upload_ceiling")]
    pub direct_upload_ceiling: u64,
    /// Node ids relocated per statement during a bulk move.
    #[serde(default = "default_move_batch_size")]
    pub move_batch_size: usize,
}

fn default_quota_bytes() -> u64 {
    crate::DEFAULT_QUOTA_BYTES
}

fn default_max_upload_bytes() -> u64 {
    crate::DEFAULT_MAX_UPLOAD_BYTES
}

fn default_direct_upload_ceiling() -> u64 {
    crate::DEFAULT_DIRECT_UPLOAD_CEILING
}

fn default_move_batch_size() -> usize {
    crate::DEFAULT_MOVE_BATCH_SIZE
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            quota_bytes: default_quota_bytes(),
            max_upload_bytes: default_max_upload_bytes(),
            direct_upload_ceiling: default_direct_upload_ceiling(),
            move_batch_size: default_move_batch_size(),
        }
    }
}

impl DriveConfig {
    /// Validate drive limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.quota_bytes == 0 {
            return Err("drive.quota_bytes must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("drive.max_upload_bytes must be greater than 0".to_string());
        }
        if self.direct_upload_ceiling == 0 {
            return Err("drive.direct_upload_ceiling must be greater than 0".to_string());
        }
        if self.move_batch_size == 0 {
            return Err("drive.move_batch_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Drive limits.
    #[serde(default)]
    pub drive: DriveConfig,
}

impl AppConfig {
    /// Create a test configuration rooted in the given directory.
    ///
    /// **For testing only.** Uses filesystem storage and a SQLite catalog under `root`.
    pub fn for_testing(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            storage: StorageConfig::Filesystem {
                path: root.join("blobs"),
            },
            metadata: MetadataConfig::Sqlite {
                path: root.join("catalog.db"),
            },
            drive: DriveConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.metadata.validate()?;
        self.drive.validate()
    }
}
