//! Per-file content fingerprints
//!
//! A fingerprint never follows symlinks: a link is identified by its own
//! mode and target text, not by what it points at.

use crate::error::{StratumError, StratumResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File, Metadata};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Produces a fingerprint for a single filesystem entry
pub trait ContentHasher: Send + Sync {
    /// Hex fingerprint of the entry at `path`
    fn fingerprint(&self, path: &Path) -> StratumResult<String>;
}

/// Which [`ContentHasher`] to use for cache keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// Mode plus content, ignoring ownership and timestamps
    #[default]
    Cache,
    /// Mode, ownership and content
    Full,
    /// Modification time only
    Mtime,
}

impl HasherKind {
    /// Build the hasher for this kind
    pub fn build(self) -> Arc<dyn ContentHasher> {
        match self {
            Self::Cache => Arc::new(CacheHasher),
            Self::Full => Arc::new(FullHasher),
            Self::Mtime => Arc::new(MtimeHasher),
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cache => "cache",
            Self::Full => "full",
            Self::Mtime => "mtime",
        };
        write!(f, "{}", name)
    }
}

/// Default hasher for cache keys: file mode, then file bytes or link target
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheHasher;

impl ContentHasher for CacheHasher {
    fn fingerprint(&self, path: &Path) -> StratumResult<String> {
        let meta = lstat(path)?;
        let mut hasher = Sha256::new();
        hasher.update(mode_string(&meta).as_bytes());
        hash_body(path, &meta, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Like [`CacheHasher`] but also sensitive to file ownership
#[derive(Debug, Clone, Copy, Default)]
pub struct FullHasher;

impl ContentHasher for FullHasher {
    fn fingerprint(&self, path: &Path) -> StratumResult<String> {
        let meta = lstat(path)?;
        let mut hasher = Sha256::new();
        hasher.update(mode_string(&meta).as_bytes());
        hasher.update(owner_string(&meta).as_bytes());
        hash_body(path, &meta, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Timestamp-only hasher. Cheap, but any touch invalidates the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeHasher;

impl ContentHasher for MtimeHasher {
    fn fingerprint(&self, path: &Path) -> StratumResult<String> {
        let meta = lstat(path)?;
        let modified = meta
            .modified()
            .map_err(|e| StratumError::path_hash(path, e))?;
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(nanos.to_string().as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

fn lstat(path: &Path) -> StratumResult<Metadata> {
    fs::symlink_metadata(path).map_err(|e| StratumError::path_hash(path, e))
}

/// Feed file bytes (regular files) or link target (symlinks) into `hasher`
fn hash_body(path: &Path, meta: &Metadata, hasher: &mut Sha256) -> StratumResult<()> {
    let file_type = meta.file_type();
    if file_type.is_file() {
        let mut file = File::open(path).map_err(|e| StratumError::path_hash(path, e))?;
        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = file
                .read(&mut buffer)
                .map_err(|e| StratumError::path_hash(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
    } else if file_type.is_symlink() {
        let target = fs::read_link(path).map_err(|e| StratumError::path_hash(path, e))?;
        hasher.update(target.to_string_lossy().as_bytes());
    }
    Ok(())
}

#[cfg(unix)]
fn mode_string(meta: &Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{:o}", meta.mode())
}

#[cfg(not(unix))]
fn mode_string(meta: &Metadata) -> String {
    let file_type = meta.file_type();
    let kind = if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'L'
    } else {
        '-'
    };
    let write = if meta.permissions().readonly() { 'r' } else { 'w' };
    format!("{}{}", kind, write)
}

#[cfg(unix)]
fn owner_string(meta: &Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{}:{}", meta.uid(), meta.gid())
}

#[cfg(not(unix))]
fn owner_string(_meta: &Metadata) -> String {
    String::new()
}
