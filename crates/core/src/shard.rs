//! Blob key sharding.
//!
//! Stored content is spread over two directory levels so that no directory holds more
//! than 1,000 entries: 1,000 blobs per level-2 directory and 1,000 level-2 directories
//! per level-1 directory.

/// Entries per shard level.
pub const SHARD_FANOUT: u64 = 1000;

/// Shard directory for a sequence number, with a trailing slash.
pub fn shard_dir(seq: u64) -> String {
    let level1 = seq / (SHARD_FANOUT * SHARD_FANOUT) + 1;
    let level2 = (seq / SHARD_FANOUT) % SHARD_FANOUT + 1;
    format!("{level1}/{level2}/")
}

/// Blob key for stored file content.
///
/// The suffix keeps keys unique when two writers derive the same sequence number.
pub fn blob_key(seq: u64, suffix: &str) -> String {
    format!("{}{}-{}", shard_dir(seq), seq, suffix)
}

/// Blob key for one part of a chunked upload.
///
/// Two writers sending the same part number never share a key.
pub fn chunk_key(content_id: u64, chunk_number: u32, suffix: &str) -> String {
    format!(
        "chunks/{}{}/{}-{}",
        shard_dir(content_id),
        content_id,
        chunk_number,
        suffix
    )
}
