//! Image configuration
//!
//! Serialized with the key layout of the image config JSON (`WorkingDir`,
//! `Env`, ...). Maps are sorted so that rendering never depends on hash
//! iteration order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder value for set-like JSON objects (`{"80/tcp": {}}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Runtime configuration of an image, mutated in place by each build step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageConfig {
    /// User the container process runs as
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,

    /// Exposed ports, e.g. `80/tcp`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exposed_ports: BTreeMap<String, Empty>,

    /// Environment as `KEY=VALUE` entries, in declaration order
    pub env: Vec<String>,

    /// Default command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,

    /// Entrypoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,

    /// Shell used for shell-form instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<Vec<String>>,

    /// Declared volumes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Empty>,

    /// Working directory for the container process and later instructions
    pub working_dir: String,

    /// Image labels
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Signal sent to stop the container
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stop_signal: String,
}

impl ImageConfig {
    /// Value of the first `name=` entry in the environment
    pub fn env_value(&self, name: &str) -> Option<&str> {
        lookup_env(&self.env, name)
    }
}

/// First `name=` entry in a `KEY=VALUE` list
pub(crate) fn lookup_env<'a>(env: &'a [String], name: &str) -> Option<&'a str> {
    env.iter().find_map(|entry| {
        let (key, value) = entry.split_once('=')?;
        (key == name).then_some(value)
    })
}

/// One entry of the image history, recorded per build step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// When the step ran
    pub created: DateTime<Utc>,

    /// The instruction that produced the step
    pub created_by: String,

    /// Whether the step produced no filesystem changes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub empty_layer: bool,
}

impl History {
    /// Create a history entry stamped with the current time
    pub fn new(created_by: impl Into<String>, empty_layer: bool) -> Self {
        Self {
            created: Utc::now(),
            created_by: created_by.into(),
            empty_layer,
        }
    }
}
