//! Composite cache keys
//!
//! A build step's cache key is an ordered list of string tokens: the digest
//! of the previous step, the instruction text, then one digest per build
//! context path the instruction reads. Token order is significant.

use crate::commands::Instruction;
use crate::error::{StratumError, StratumResult};
use crate::hash::{hash_bytes, hash_dir, sha256_hex, CacheHasher, ContentHasher};
use crate::image::{BuildArgs, ImageConfig};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Separator between tokens in [`CompositeCache::key`]
pub const KEY_SEPARATOR: &str = "-";

/// Ordered, append-only token list reduced to one SHA-256 digest
#[derive(Clone)]
pub struct CompositeCache {
    keys: Vec<String>,
    hasher: Arc<dyn ContentHasher>,
}

impl CompositeCache {
    /// Create a cache seeded with `initial` tokens, using [`CacheHasher`]
    pub fn new<I, S>(initial: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_hasher(initial, Arc::new(CacheHasher))
    }

    /// Create a cache seeded with `initial` tokens and a specific file hasher
    pub fn with_hasher<I, S>(initial: I, hasher: Arc<dyn ContentHasher>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: initial.into_iter().map(Into::into).collect(),
            hasher,
        }
    }

    /// Append an instruction and every context path it reads
    pub fn add_command(
        &mut self,
        instruction: &dyn Instruction,
        build_args: &BuildArgs,
        config: &ImageConfig,
    ) -> StratumResult<()> {
        self.add_key([instruction.to_string()]);

        let files = instruction.files_used_from_context(config, build_args)?;
        for file in &files {
            self.add_path(file)?;
        }
        Ok(())
    }

    /// Append raw tokens in order
    pub fn add_key<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
    }

    /// Append the digest of a file or directory.
    ///
    /// The path is classified without following symlinks, so a link to a
    /// directory is hashed as an opaque file rather than traversed.
    pub fn add_path(&mut self, path: &Path) -> StratumResult<()> {
        let token = path_token(path, self.hasher.as_ref())?;
        self.keys.push(token);
        Ok(())
    }

    /// Append the digests of `paths`, hashing them in parallel.
    ///
    /// Results are appended in the order of `paths`. Nothing is appended if
    /// any path fails.
    pub async fn add_paths_concurrent(&mut self, paths: &[PathBuf]) -> StratumResult<()> {
        let handles = paths.iter().cloned().map(|path| {
            let hasher = Arc::clone(&self.hasher);
            tokio::task::spawn_blocking(move || path_token(&path, hasher.as_ref()))
        });

        let results = futures_util::future::try_join_all(handles)
            .await
            .map_err(|e| StratumError::Internal(format!("hashing task failed: {}", e)))?;
        let tokens = results.into_iter().collect::<StratumResult<Vec<_>>>()?;

        debug!("Hashed {} context paths concurrently", tokens.len());
        self.keys.extend(tokens);
        Ok(())
    }

    /// Human readable key, for diagnostics
    pub fn key(&self) -> String {
        self.keys.join(KEY_SEPARATOR)
    }

    /// Hex SHA-256 of [`Self::key`], used for cache lookups
    pub fn hash(&self) -> StratumResult<String> {
        sha256_hex(self.key().as_bytes()).map_err(|e| StratumError::io("hashing cache key", e))
    }

    /// Independent cache with the same tokens
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Tokens appended so far
    pub fn tokens(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for CompositeCache {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl PartialEq for CompositeCache {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for CompositeCache {}

impl fmt::Debug for CompositeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeCache")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// Digest token for one path.
///
/// Directories get the directory digest. Everything else gets the SHA-256
/// of its fingerprint, which keeps tokens the same length whatever hasher
/// is configured.
fn path_token(path: &Path, hasher: &dyn ContentHasher) -> StratumResult<String> {
    let meta = fs::symlink_metadata(path).map_err(|e| StratumError::path_hash(path, e))?;
    if meta.is_dir() {
        return hash_dir(path, hasher);
    }
    let fingerprint = hasher.fingerprint(path)?;
    Ok(hash_bytes(fingerprint.as_bytes()))
}
