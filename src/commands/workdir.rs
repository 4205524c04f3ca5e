//! WORKDIR instruction

use crate::commands::{FsOps, HostFs, Instruction};
use crate::error::{StratumError, StratumResult};
use crate::image::{BuildArgs, ImageConfig};
use crate::shell::{join_path, resolve_environment_replacement};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Permission mode for directories created by WORKDIR
pub const WORKDIR_MODE: u32 = 0o755;

/// Parsed `WORKDIR <path>` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workdir {
    /// Raw path expression, before variable substitution
    pub path: String,
}

impl Workdir {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl fmt::Display for Workdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WORKDIR {}", self.path)
    }
}

/// Resolve `path` and make it the working directory of `config`.
///
/// Relative paths are joined onto the current working directory.
fn update_workdir(
    path: &str,
    config: &mut ImageConfig,
    build_args: &BuildArgs,
) -> StratumResult<()> {
    let replacement_envs = build_args.replacement_envs(&config.env);
    let resolved = resolve_environment_replacement(path, &replacement_envs, true)?;

    config.working_dir = if resolved.starts_with('/') {
        resolved
    } else {
        join_path(&config.working_dir, &resolved)
    };

    info!("Changed working directory to {}", config.working_dir);
    Ok(())
}

/// WORKDIR that creates the directory when it is missing
#[derive(Debug)]
pub struct WorkdirCommand {
    cmd: Workdir,
    fs: Arc<dyn FsOps>,
    snapshot_files: Vec<PathBuf>,
}

impl WorkdirCommand {
    pub fn new(cmd: Workdir, fs: Arc<dyn FsOps>) -> Self {
        Self {
            cmd,
            fs,
            snapshot_files: Vec::new(),
        }
    }

    /// WORKDIR against the host root filesystem
    pub fn on_host(cmd: Workdir) -> Self {
        Self::new(cmd, Arc::new(HostFs::new()))
    }
}

impl fmt::Display for WorkdirCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cmd, f)
    }
}

impl Instruction for WorkdirCommand {
    fn execute(&mut self, config: &mut ImageConfig, build_args: &BuildArgs) -> StratumResult<()> {
        info!("cmd: workdir");
        update_workdir(&self.cmd.path, config, build_args)?;

        // Only a missing directory is created and snapshotted; an existing
        // one leaves an empty layer that is cheap to cache.
        self.snapshot_files.clear();
        let dir = PathBuf::from(&config.working_dir);
        if self.fs.exists(&dir) {
            debug!("Directory {} already exists", dir.display());
            return Ok(());
        }

        info!("Creating directory {}", dir.display());
        self.snapshot_files.push(dir.clone());
        self.fs
            .create_dir_all(&dir, WORKDIR_MODE)
            .map_err(|source| StratumError::CreateDir { path: dir, source })
    }

    fn files_to_snapshot(&self) -> &[PathBuf] {
        &self.snapshot_files
    }

    fn metadata_only(&self) -> bool {
        false
    }

    fn requires_unpacked_fs(&self) -> bool {
        true
    }

    fn should_cache_output(&self) -> bool {
        true
    }

    fn cache_command(&self) -> Option<Box<dyn Instruction>> {
        Some(Box::new(CachedWorkdirCommand::new(self.cmd.clone())))
    }
}

/// WORKDIR replayed from cache: updates the config, never touches the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedWorkdirCommand {
    cmd: Workdir,
}

impl CachedWorkdirCommand {
    pub fn new(cmd: Workdir) -> Self {
        Self { cmd }
    }
}

impl fmt::Display for CachedWorkdirCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cmd, f)
    }
}

impl Instruction for CachedWorkdirCommand {
    fn execute(&mut self, config: &mut ImageConfig, build_args: &BuildArgs) -> StratumResult<()> {
        info!("cmd: workdir");
        update_workdir(&self.cmd.path, config, build_args)
    }

    fn cache_command(&self) -> Option<Box<dyn Instruction>> {
        Some(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fs::testing::{FsCall, RecordingFs};
    use std::io;

    fn full(path: &str, fs: &Arc<RecordingFs>) -> WorkdirCommand {
        WorkdirCommand::new(Workdir::new(path), fs.clone())
    }

    #[test]
    fn absolute_path_on_fresh_fs() {
        let fs = Arc::new(RecordingFs::default());
        let mut cmd = full("/foo", &fs);
        let mut config = ImageConfig::default();

        cmd.execute(&mut config, &BuildArgs::new()).unwrap();

        assert_eq!(config.working_dir, "/foo");
        assert_eq!(cmd.files_to_snapshot(), &[PathBuf::from("/foo")]);
        assert_eq!(
            fs.calls(),
            vec![
                FsCall::Exists(PathBuf::from("/foo")),
                FsCall::CreateDirAll(PathBuf::from("/foo"), 0o755),
            ]
        );
    }

    #[test]
    fn relative_path_joins_current_workdir() {
        let fs = Arc::new(RecordingFs::default());
        let mut cmd = full("relative", &fs);
        let mut config = ImageConfig {
            working_dir: "/base".to_string(),
            ..Default::default()
        };

        cmd.execute(&mut config, &BuildArgs::new()).unwrap();

        assert_eq!(config.working_dir, "/base/relative");
    }

    #[test]
    fn existing_directory_leaves_empty_snapshot() {
        let fs = Arc::new(RecordingFs::with_existing(["/srv"]));
        let mut cmd = full("/srv", &fs);
        let mut config = ImageConfig::default();

        cmd.execute(&mut config, &BuildArgs::new()).unwrap();

        assert!(cmd.files_to_snapshot().is_empty());
        assert_eq!(fs.calls(), vec![FsCall::Exists(PathBuf::from("/srv"))]);
    }

    #[test]
    fn substitutes_env_and_build_args() {
        let fs = Arc::new(RecordingFs::default());
        let mut cmd = full("$HOME/${APP}", &fs);
        let mut args = BuildArgs::from_user_args(["APP=api"]);
        args.add_arg("APP", None);
        let mut config = ImageConfig {
            env: vec!["HOME=/home/dev".to_string()],
            ..Default::default()
        };

        cmd.execute(&mut config, &args).unwrap();

        assert_eq!(config.working_dir, "/home/dev/api");
    }

    #[test]
    fn substitution_error_aborts_before_fs() {
        let fs = Arc::new(RecordingFs::default());
        let mut cmd = full("${BROKEN", &fs);
        let mut config = ImageConfig {
            working_dir: "/keep".to_string(),
            ..Default::default()
        };

        let err = cmd.execute(&mut config, &BuildArgs::new()).unwrap_err();

        assert!(matches!(err, StratumError::Substitution { .. }));
        assert_eq!(config.working_dir, "/keep");
        assert!(fs.calls().is_empty());
    }

    #[test]
    fn create_failure_keeps_snapshot_entry() {
        let fs = Arc::new(RecordingFs::failing(io::ErrorKind::PermissionDenied));
        let mut cmd = full("/locked", &fs);
        let mut config = ImageConfig::default();

        let err = cmd.execute(&mut config, &BuildArgs::new()).unwrap_err();

        assert!(matches!(err, StratumError::CreateDir { .. }));
        assert_eq!(cmd.files_to_snapshot(), &[PathBuf::from("/locked")]);
        assert_eq!(config.working_dir, "/locked");
    }

    #[test]
    fn cached_variant_matches_full_without_fs() {
        let fs = Arc::new(RecordingFs::default());
        let mut full_cmd = full("app/../srv", &fs);
        let mut cached = full_cmd.cache_command().unwrap();

        let base = ImageConfig {
            working_dir: "/base".to_string(),
            ..Default::default()
        };
        let mut full_config = base.clone();
        let mut cached_config = base.clone();

        full_cmd.execute(&mut full_config, &BuildArgs::new()).unwrap();
        let calls_after_full = fs.calls().len();
        cached.execute(&mut cached_config, &BuildArgs::new()).unwrap();

        assert_eq!(full_config, cached_config);
        assert_eq!(cached_config.working_dir, "/base/srv");
        assert_eq!(fs.calls().len(), calls_after_full);
        assert!(cached.metadata_only());
        assert!(cached.files_to_snapshot().is_empty());
    }

    #[test]
    fn variants_share_text() {
        let full_cmd = WorkdirCommand::on_host(Workdir::new("/app"));
        let cached = CachedWorkdirCommand::new(Workdir::new("/app"));
        assert_eq!(full_cmd.to_string(), "WORKDIR /app");
        assert_eq!(full_cmd.to_string(), cached.to_string());
    }

    #[test]
    fn capability_flags() {
        let full_cmd = WorkdirCommand::on_host(Workdir::new("/app"));
        assert!(!full_cmd.metadata_only());
        assert!(full_cmd.requires_unpacked_fs());
        assert!(full_cmd.should_cache_output());

        let cached = CachedWorkdirCommand::new(Workdir::new("/app"));
        assert!(cached.metadata_only());
        assert!(!cached.requires_unpacked_fs());
        assert_eq!(cached.cache_command().unwrap().to_string(), "WORKDIR /app");
    }
}
