//! Placement error types.

use std::path::PathBuf;

use edgeplan_core::ConfigError;
use thiserror::Error;

/// Errors that can occur while building topologies and planning trees.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("topology has no nodes")]
    EmptyTopology,

    #[error("no services to place")]
    NoServices,

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node id {0:?} cannot be used as a file name")]
    InvalidNodeId(String),

    #[error("fallback node {0} is not part of the topology")]
    UnknownFallback(String),

    #[error(
        "tree size constraints not met after {attempts} attempts \
         (every tree >= {min_tree_size}, at least one >= {at_least_one_tree_size})"
    )]
    MaxAttemptsExceeded {
        attempts: u32,
        min_tree_size: usize,
        at_least_one_tree_size: usize,
    },

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("input error: {0}")]
    Config(#[from] ConfigError),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
