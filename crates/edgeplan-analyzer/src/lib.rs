pub mod deviation;
pub mod error;
pub mod report;

use anyhow::{Context, Result};
use std::path::Path;

use edgeplan_core::artifact::{read_fallback, read_tree_artifact};

pub use deviation::{ObservedDeployment, ObservedGraph, OptimalChain, analyze, analyze_deployment};
pub use error::{AnalyzerError, AnalyzerResult};
pub use report::{DeploymentDeviation, DeviationReport, format_report};

/// Analyze a live run's observed results against a generation run's
/// canonical tree and root.
pub fn analyze_run(tree: &Path, observed: &Path, fallback: &Path) -> Result<DeviationReport> {
    let root = read_fallback(fallback)
        .with_context(|| format!("reading root from {}", fallback.display()))?;
    let chains = read_tree_artifact(tree)
        .with_context(|| format!("reading canonical tree from {}", tree.display()))?;
    let graph = ObservedGraph::load(observed)?;

    tracing::info!(root = %root, deployments = chains.len(), "Analyzing observed results");

    Ok(analyze(&root, &chains, &graph)?)
}
