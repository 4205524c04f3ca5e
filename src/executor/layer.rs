//! Layer collaborators
//!
//! Storage of cached layers and the filesystem diff that produces them live
//! outside this crate. The executor only talks to them through these traits.

use crate::error::StratumResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A captured filesystem layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Digest of the layer blob
    pub digest: String,

    /// Paths the layer was captured from
    pub files: Vec<PathBuf>,
}

impl Layer {
    /// Whether the layer carries no filesystem changes
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Cache of layers keyed by composite cache digest
#[async_trait]
pub trait LayerCache: Send + Sync {
    /// Layer stored under `key`, if any
    async fn lookup(&self, key: &str) -> StratumResult<Option<Layer>>;

    /// Store `layer` under `key`
    async fn store(&self, key: &str, layer: &Layer) -> StratumResult<()>;
}

/// Turns a snapshot set into a layer
#[async_trait]
pub trait Snapshotter: Send + Sync {
    /// Capture `files` into a layer.
    ///
    /// An empty `files` yields an empty layer, which is still cacheable.
    async fn take_snapshot(&self, files: &[PathBuf]) -> StratumResult<Layer>;
}
