//! Analyzer error types.

use std::path::PathBuf;

use edgeplan_core::ArtifactError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("deployment {0} is in the canonical tree but missing from the observed results")]
    MissingDeployment(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse observed results {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
