//! Sequential stage executor

use crate::cache::CompositeCache;
use crate::commands::Instruction;
use crate::config::CacheConfig;
use crate::error::StratumResult;
use crate::executor::layer::{Layer, LayerCache, Snapshotter};
use crate::hash::ContentHasher;
use crate::image::{BuildArgs, History, ImageConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one build step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Instruction text
    pub instruction: String,

    /// Cache key digest, `None` when caching was off for this step
    pub cache_key: Option<String>,

    /// Whether the step was replayed from cache
    pub cache_hit: bool,

    /// Paths the Full variant reported; empty on cache hits
    pub snapshot: Vec<PathBuf>,

    /// Layer produced by the snapshotter, or restored from cache
    pub layer: Layer,
}

/// Outcome of a whole stage
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub steps: Vec<StepReport>,
    pub history: Vec<History>,
}

impl StageReport {
    /// Number of steps replayed from cache
    pub fn cache_hits(&self) -> usize {
        self.steps.iter().filter(|s| s.cache_hit).count()
    }

    /// Cache key of the last step, if it had one
    pub fn last_cache_key(&self) -> Option<&str> {
        self.steps.last().and_then(|s| s.cache_key.as_deref())
    }
}

/// Runs instructions one after another, consulting the layer cache
pub struct StageExecutor<'a> {
    settings: CacheConfig,
    hasher: Arc<dyn ContentHasher>,
    layer_cache: &'a dyn LayerCache,
    snapshotter: &'a dyn Snapshotter,
}

impl<'a> StageExecutor<'a> {
    pub fn new(
        settings: &CacheConfig,
        layer_cache: &'a dyn LayerCache,
        snapshotter: &'a dyn Snapshotter,
    ) -> Self {
        Self {
            settings: settings.clone(),
            hasher: settings.hasher.build(),
            layer_cache,
            snapshotter,
        }
    }

    /// Execute `instructions` in order against `config`.
    ///
    /// Cache keys are chained from `base_digest`: each step's key starts from
    /// the previous step's digest. If a key cannot be built
    /// because a context path could not be hashed, the step and every step
    /// after it run uncached. Execution errors abort the stage.
    pub async fn build(
        &self,
        base_digest: &str,
        instructions: Vec<Box<dyn Instruction>>,
        config: &mut ImageConfig,
        build_args: &BuildArgs,
    ) -> StratumResult<StageReport> {
        let mut chain = self
            .settings
            .enabled
            .then(|| CompositeCache::with_hasher([base_digest], Arc::clone(&self.hasher)));
        let mut report = StageReport::default();

        for instruction in instructions {
            let step_cache = match chain.take() {
                Some(prev) => {
                    self.step_key(prev, instruction.as_ref(), config, build_args)
                        .await?
                }
                None => None,
            };
            let cache_key = step_cache.as_ref().map(CompositeCache::hash).transpose()?;

            // The next step starts from this step's digest alone
            chain = cache_key
                .as_deref()
                .map(|digest| CompositeCache::with_hasher([digest], Arc::clone(&self.hasher)));

            let step = self.run_step(instruction, cache_key, config, build_args).await?;
            report
                .history
                .push(History::new(&step.instruction, step.layer.is_empty()));
            report.steps.push(step);
        }

        debug!(
            "Stage finished: {} steps, {} cache hits",
            report.steps.len(),
            report.cache_hits()
        );
        Ok(report)
    }

    /// Extend the chained key with the step's environment and instruction
    async fn step_key(
        &self,
        mut cache: CompositeCache,
        instruction: &dyn Instruction,
        config: &ImageConfig,
        build_args: &BuildArgs,
    ) -> StratumResult<Option<CompositeCache>> {
        // Variables visible to the step, sorted for a stable key. The `|N`
        // marker cannot collide with instruction text.
        let mut envs = build_args.replacement_envs(&config.env);
        envs.sort();
        if !envs.is_empty() {
            cache.add_key([format!("|{}", envs.len())]);
            cache.add_key(envs);
        }

        let result = if self.settings.concurrent_hashing {
            cache.add_key([instruction.to_string()]);
            match instruction.files_used_from_context(config, build_args) {
                Ok(files) => cache.add_paths_concurrent(&files).await,
                Err(e) => Err(e),
            }
        } else {
            cache.add_command(instruction, build_args, config)
        };

        match result {
            Ok(()) => Ok(Some(cache)),
            Err(e) if e.is_cache_key_error() => {
                warn!(
                    "Cannot compute cache key for {}, running uncached: {}",
                    instruction, e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_step(
        &self,
        mut instruction: Box<dyn Instruction>,
        cache_key: Option<String>,
        config: &mut ImageConfig,
        build_args: &BuildArgs,
    ) -> StratumResult<StepReport> {
        let text = instruction.to_string();

        let cached_layer = match &cache_key {
            Some(key) => self.lookup(key, &text).await,
            None => None,
        };

        if let Some(layer) = cached_layer {
            if let Some(mut cached) = instruction.cache_command() {
                info!("Using cached layer for {}", text);
                cached.execute(config, build_args)?;
                return Ok(StepReport {
                    instruction: text,
                    cache_key,
                    cache_hit: true,
                    snapshot: Vec::new(),
                    layer,
                });
            }
            debug!("{} has no cached form, executing", text);
        }

        instruction.execute(config, build_args)?;
        let snapshot = instruction.files_to_snapshot().to_vec();
        let layer = self.snapshotter.take_snapshot(&snapshot).await?;

        if let Some(key) = &cache_key {
            if instruction.should_cache_output() {
                if let Err(e) = self.layer_cache.store(key, &layer).await {
                    warn!("Failed to cache layer for {}: {}", text, e);
                }
            }
        }

        Ok(StepReport {
            instruction: text,
            cache_key,
            cache_hit: false,
            snapshot,
            layer,
        })
    }

    /// Look up a layer, treating lookup failures as misses
    async fn lookup(&self, key: &str, text: &str) -> Option<Layer> {
        match self.layer_cache.lookup(key).await {
            Ok(Some(layer)) => Some(layer),
            Ok(None) => {
                info!("No cached layer found for {}", text);
                None
            }
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", text, e);
                None
            }
        }
    }
}
