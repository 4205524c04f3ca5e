//! Stratum - Daemonless Image Build Core
//!
//! Executes build instructions directly against a root filesystem and
//! computes the content-addressed cache keys that let unchanged steps be
//! replayed from previously captured layers.

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod hash;
pub mod image;
pub mod logging;
pub mod shell;

pub use error::{StratumError, StratumResult};
