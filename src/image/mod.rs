//! Image data model
//!
//! The mutable image configuration instructions operate on, the history
//! recorded per build step, and the build-time variable overlay.

pub mod build_args;
pub mod config;

pub use build_args::BuildArgs;
pub use config::{History, ImageConfig};
