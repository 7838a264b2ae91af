//! Human-readable and JSON output.

use anyhow::{Context, Result};
use larder_core::NodeKind;
use larder_drive::{DeleteSummary, SpaceReport, TreeEntry};
use serde::Serialize;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

pub fn render_listing(entries: &[TreeEntry]) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    for entry in entries {
        let size = match entry.kind {
            NodeKind::Directory => "-".to_string(),
            NodeKind::File if entry.is_chunked && entry.size == Some(0) => "pending".to_string(),
            NodeKind::File => format_bytes(entry.size.unwrap_or(0)),
        };
        let name = match entry.kind {
            NodeKind::Directory => format!("{}/", entry.name),
            NodeKind::File => entry.name.clone(),
        };
        println!("{:>8}  {:>12}  {}", entry.id, size, name);
    }
}

pub fn render_space(space: &SpaceReport) {
    println!(
        "Used {} of {} ({} available)",
        format_bytes(space.used),
        format_bytes(space.total),
        format_bytes(space.available())
    );
}

pub fn render_delete(summary: &DeleteSummary) {
    println!("Deleted {} item(s)", summary.nodes_removed);
    if summary.blobs_failed > 0 {
        eprintln!(
            "Warning: {} stored blob(s) could not be removed",
            summary.blobs_failed
        );
    }
}
