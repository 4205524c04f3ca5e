//! Integration tests for Stratum

mod build_tests {
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use stratum::cache::CompositeCache;
    use stratum::commands::{HostFs, Instruction, Workdir, WorkdirCommand};
    use stratum::config::Settings;
    use stratum::executor::{Layer, LayerCache, Snapshotter, StageExecutor};
    use stratum::image::{BuildArgs, ImageConfig};
    use stratum::StratumResult;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryCache(Mutex<HashMap<String, Layer>>);

    #[async_trait]
    impl LayerCache for MemoryCache {
        async fn lookup(&self, key: &str) -> StratumResult<Option<Layer>> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        async fn store(&self, key: &str, layer: &Layer) -> StratumResult<()> {
            self.0.lock().unwrap().insert(key.to_string(), layer.clone());
            Ok(())
        }
    }

    struct CountingSnapshotter(Mutex<usize>);

    #[async_trait]
    impl Snapshotter for CountingSnapshotter {
        async fn take_snapshot(&self, files: &[PathBuf]) -> StratumResult<Layer> {
            let mut count = self.0.lock().unwrap();
            *count += 1;
            Ok(Layer {
                digest: format!("sha256:layer{}", count),
                files: files.to_vec(),
            })
        }
    }

    fn dockerfile(root: &TempDir) -> Vec<Box<dyn Instruction>> {
        let fs = Arc::new(HostFs::with_root(root.path()));
        ["/opt/${APP}", "data", "../shared"]
            .into_iter()
            .map(|path| {
                let cmd: Box<dyn Instruction> =
                    Box::new(WorkdirCommand::new(Workdir::new(path), fs.clone()));
                cmd
            })
            .collect()
    }

    fn build_args() -> BuildArgs {
        let mut args = BuildArgs::from_user_args(["APP=billing"]);
        args.add_arg("APP", Some("default"));
        args
    }

    #[tokio::test]
    async fn workdir_stage_builds_then_replays() {
        let settings = Settings::default();
        let cache = MemoryCache::default();
        let snapshotter = CountingSnapshotter(Mutex::new(0));
        let executor = StageExecutor::new(&settings.cache, &cache, &snapshotter);

        let root = TempDir::new().unwrap();
        let mut config = ImageConfig::default();
        let report = executor
            .build("sha256:base", dockerfile(&root), &mut config, &build_args())
            .await
            .unwrap();

        assert_eq!(config.working_dir, "/opt/billing/shared");
        assert_eq!(report.cache_hits(), 0);
        assert_eq!(
            report.steps[1].snapshot,
            vec![PathBuf::from("/opt/billing/data")]
        );
        assert!(root.path().join("opt/billing/data").is_dir());
        assert!(root.path().join("opt/billing/shared").is_dir());

        let replay_root = TempDir::new().unwrap();
        let mut replay_config = ImageConfig::default();
        let replay = executor
            .build("sha256:base", dockerfile(&replay_root), &mut replay_config, &build_args())
            .await
            .unwrap();

        assert_eq!(replay.cache_hits(), 3);
        assert_eq!(replay_config, config);
        assert_eq!(*snapshotter.0.lock().unwrap(), 3);
        assert!(std::fs::read_dir(replay_root.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn build_arg_change_invalidates_cache() {
        let settings = Settings::default();
        let cache = MemoryCache::default();
        let snapshotter = CountingSnapshotter(Mutex::new(0));
        let executor = StageExecutor::new(&settings.cache, &cache, &snapshotter);
        let root = TempDir::new().unwrap();

        let first = executor
            .build("sha256:base", dockerfile(&root), &mut ImageConfig::default(), &build_args())
            .await
            .unwrap();

        let mut other_args = BuildArgs::from_user_args(["APP=payments"]);
        other_args.add_arg("APP", None);
        let mut config = ImageConfig::default();
        let second = executor
            .build("sha256:base", dockerfile(&root), &mut config, &other_args)
            .await
            .unwrap();

        assert_ne!(first.last_cache_key(), second.last_cache_key());
        assert_eq!(second.cache_hits(), 0);
        assert_eq!(config.working_dir, "/opt/payments/shared");
    }

    #[test]
    fn composite_key_matches_manual_chain() {
        let cmd = WorkdirCommand::on_host(Workdir::new("/app"));
        let mut cache = CompositeCache::new(["sha256:base"]);
        cache
            .add_command(&cmd, &BuildArgs::new(), &ImageConfig::default())
            .unwrap();

        let mut manual = CompositeCache::new(["sha256:base"]);
        manual.add_key(["WORKDIR /app"]);

        assert_eq!(cache.key(), "sha256:base-WORKDIR /app");
        assert_eq!(cache.hash().unwrap(), manual.hash().unwrap());
    }
}
