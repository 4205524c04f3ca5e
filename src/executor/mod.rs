//! Stage execution
//!
//! Drives a sequence of instructions against one image config:
//! - computes each step's cache key, chained from the step before
//! - replays cached steps with their metadata-only variant
//! - executes and snapshots everything else

mod layer;
mod stage;

pub use layer::{Layer, LayerCache, Snapshotter};
pub use stage::{StageExecutor, StageReport, StepReport};
