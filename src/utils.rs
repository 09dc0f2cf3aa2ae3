// src/utils.rs
use sha2::{Digest, Sha256};
use std::path::Path;

/// Computes SHA256 hash of content with normalized line endings.
/// Always normalizes CRLF/CR to LF before hashing to ensure consistent
/// hashes across Windows/Unix platforms.
#[must_use]
pub fn compute_sha256(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    sha256_bytes(normalized.as_bytes())
}

/// SHA256 of raw bytes. Used where byte identity matters (snapshots).
#[must_use]
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Normalizes a path to use forward slashes (cross-platform pattern matching).
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Counts lines the way editors do: a trailing newline does not open a new line.
#[must_use]
pub fn line_count(content: &str) -> usize {
    content.lines().count()
}
