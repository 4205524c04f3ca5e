//! Filesystem operations used by instructions
//!
//! Instructions receive an [`FsOps`] at construction instead of calling
//! `std::fs` directly, so tests can observe or fail every mutation.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem collaborator for Full instruction variants
pub trait FsOps: Send + Sync + fmt::Debug {
    /// Whether anything exists at `path`.
    ///
    /// Only "not found" counts as absent; symlinks are followed.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing ancestors with permission `mode`
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// Host filesystem, with image paths mapped under `root`
#[derive(Debug, Clone)]
pub struct HostFs {
    root: PathBuf,
}

impl HostFs {
    /// Operate on the real root filesystem
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Operate on a root filesystem unpacked at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Host path for an image path
    pub fn host_path(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl Default for HostFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FsOps for HostFs {
    fn exists(&self, path: &Path) -> bool {
        !matches!(fs::metadata(self.host_path(path)), Err(e) if e.kind() == io::ErrorKind::NotFound)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(self.host_path(path))
    }
}
