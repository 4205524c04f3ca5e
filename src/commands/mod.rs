//! Build instructions
//!
//! Every instruction kind comes in two role variants implementing
//! [`Instruction`]:
//! - Full: performs the real work and reports the paths it touched
//! - Cached: replays only the configuration side effect after a cache hit
//!
//! Both variants render the same text, so a cache key computed for one is
//! valid for the other.

mod fs;
pub mod workdir;

pub use fs::{FsOps, HostFs};
pub use workdir::{CachedWorkdirCommand, Workdir, WorkdirCommand};

use crate::error::StratumResult;
use crate::image::{BuildArgs, ImageConfig};
use std::fmt;
use std::path::PathBuf;

/// One executable build step.
///
/// The `Display` output is the canonical form of the instruction: it is
/// logged, recorded in the image history and appended to the cache key, so
/// it must be stable across runs.
pub trait Instruction: fmt::Display + fmt::Debug + Send + Sync {
    /// Apply the instruction to `config`, and for Full variants to the
    /// filesystem
    fn execute(&mut self, config: &mut ImageConfig, build_args: &BuildArgs) -> StratumResult<()>;

    /// Paths created or modified by the last successful `execute`
    fn files_to_snapshot(&self) -> &[PathBuf] {
        &[]
    }

    /// Build context paths whose contents the cache key must cover, in order
    fn files_used_from_context(
        &self,
        _config: &ImageConfig,
        _build_args: &BuildArgs,
    ) -> StratumResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    /// Whether the instruction only touches image metadata
    fn metadata_only(&self) -> bool {
        true
    }

    /// Whether the root filesystem must be unpacked before `execute`
    fn requires_unpacked_fs(&self) -> bool {
        false
    }

    /// Whether the layer produced by a Full execution may be cached
    fn should_cache_output(&self) -> bool {
        false
    }

    /// Cached counterpart with the same parameters, if the kind has one
    fn cache_command(&self) -> Option<Box<dyn Instruction>> {
        None
    }
}
