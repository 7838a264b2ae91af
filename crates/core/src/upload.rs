//! Upload handle for chunked uploads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle returned by chunked-upload preparation.
///
/// Wraps the id of the pending file content row. Callers pass it back when appending
/// chunks and when finalizing the upload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadHandle(i64);

impl UploadHandle {
    pub fn new(content_id: i64) -> Self {
        Self(content_id)
    }

    /// Id of the file content row this handle refers to.
    pub fn content_id(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for UploadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadHandle({})", self.0)
    }
}

impl fmt::Display for UploadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadHandle {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        s.parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(Self)
            .ok_or_else(|| crate::Error::InvalidUploadHandle(s.to_string()))
    }
}
