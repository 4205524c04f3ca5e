//! Content-addressed build cache keys
//!
//! Each build step is keyed by a [`CompositeCache`] seeded with the digest
//! of the step before it, so a change anywhere invalidates every later step.
//!
//! # Key Construction
//!
//! | Token | Source |
//! |-------|--------|
//! | previous digest | prior step, or the base image digest |
//! | instruction text | `Display` of the instruction |
//! | path digest | one per context path, in reported order |
//!
//! Where entries are stored and how layers are serialized is up to the
//! [`LayerCache`](crate::executor::LayerCache) implementation.

pub mod composite;

pub use composite::{CompositeCache, KEY_SEPARATOR};
