//! Input and artifact error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading node and service configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} defines no nodes")]
    EmptyNodeSet(PathBuf),

    #[error("{0} defines no services")]
    EmptyServiceSet(PathBuf),

    #[error("node {node} lists unknown neighbour {neighbour}")]
    UnknownNeighbour { node: String, neighbour: String },

    #[error("node {0} lists itself as a neighbour")]
    SelfNeighbour(String),

    #[error("node {node} lists neighbour {neighbour} more than once")]
    DuplicateNeighbour { node: String, neighbour: String },
}

/// Errors raised while reading run artifacts (tree file, fallback file).
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tree line {line}: {reason}")]
    MalformedTree { line: usize, reason: String },

    #[error("service {0} appears more than once in the tree artifact")]
    DuplicateService(String),

    #[error("tree artifact contains no services")]
    EmptyTree,

    #[error("root identifier in {0} is empty")]
    EmptyRoot(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ArtifactResult<T> = Result<T, ArtifactError>;
