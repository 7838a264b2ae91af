//! Per-owner quota accounting.
//!
//! Usage is derived from the catalog on every check and never cached. The check and
//! the write that follows are not atomic, so concurrent uploads by one owner can
//! briefly overshoot the ceiling.

use crate::error::{DriveError, DriveResult};
use larder_metadata::MetadataStore;
use std::sync::Arc;
use uuid::Uuid;

/// Computes consumed bytes and enforces ceilings before writes.
#[derive(Clone)]
pub struct QuotaAccountant {
    metadata: Arc<dyn MetadataStore>,
}

impl QuotaAccountant {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Sum of the sizes of all the owner's files, at any depth.
    pub async fn compute_used(&self, owner: Uuid) -> DriveResult<u64> {
        let used = self.metadata.used_bytes(owner).await?;
        Ok(u64::try_from(used).unwrap_or(0))
    }

    /// Fail with `QuotaExceeded` if `candidate` more bytes would pass `ceiling`.
    ///
    /// Returns the current usage.
    pub async fn enforce(&self, owner: Uuid, candidate: u64, ceiling: u64) -> DriveResult<u64> {
        let used = self.compute_used(owner).await?;
        check(used, candidate, ceiling)?;
        Ok(used)
    }
}

/// Exactly reaching the ceiling is allowed.
/// A sum that overflows `u64` is over every ceiling.
pub fn check(used: u64, incoming: u64, ceiling: u64) -> DriveResult<()> {
    match used.checked_add(incoming) {
        Some(total) if total <= ceiling => Ok(()),
        _ => Err(DriveError::QuotaExceeded {
            used,
            incoming,
            ceiling,
        }),
    }
}
