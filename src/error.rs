//! Error types for Stratum
//!
//! All modules use `StratumResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Stratum operations
pub type StratumResult<T> = Result<T, StratumError>;

/// All errors that can occur while building a step
#[derive(Error, Debug)]
pub enum StratumError {
    // Substitution errors
    #[error("Failed to resolve {input:?}: {reason}")]
    Substitution { input: String, reason: String },

    // Cache key errors
    #[error("Failed to hash {path}: {source}")]
    PathHash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    // Filesystem mutation errors
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Collaborator errors
    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    #[error("Layer cache error: {0}")]
    LayerCache(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StratumError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a substitution error for the given raw input
    pub fn substitution(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Substitution {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a hashing error for a path
    pub fn path_hash(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PathHash {
            path: path.into(),
            source,
        }
    }

    /// Whether the error happened while building a cache key.
    ///
    /// Callers may treat these as an unconditional cache miss instead of
    /// aborting the build.
    pub fn is_cache_key_error(&self) -> bool {
        matches!(self, Self::PathHash { .. } | Self::Walk { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Substitution { .. } => {
                Some("Check that every ${VAR} is terminated and required variables are set")
            }
            Self::CreateDir { .. } => {
                Some("Check permissions and free space on the root filesystem")
            }
            Self::PathHash { .. } | Self::Walk { .. } => {
                Some("A build context file changed or disappeared while computing the cache key")
            }
            _ => None,
        }
    }
}
