//! Deterministic directory hashing

use crate::error::{StratumError, StratumResult};
use crate::hash::ContentHasher;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Fold a directory subtree into a single hex digest.
///
/// Entries are visited top-down in file-name order at every level, the root
/// included, and symlinks are never followed. Each entry's fingerprint from
/// `hasher` is fed into one running SHA-256, so identical trees hash
/// identically regardless of how the platform orders directory reads.
pub fn hash_dir(path: &Path, hasher: &dyn ContentHasher) -> StratumResult<String> {
    let mut sha = Sha256::new();
    let mut entries = 0usize;

    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| StratumError::Walk {
            path: e.path().unwrap_or(path).to_path_buf(),
            reason: e.to_string(),
        })?;
        let fingerprint = hasher.fingerprint(entry.path())?;
        sha.update(fingerprint.as_bytes());
        entries += 1;
    }

    debug!("Hashed {} entries under {}", entries, path.display());
    Ok(hex::encode(sha.finalize()))
}
