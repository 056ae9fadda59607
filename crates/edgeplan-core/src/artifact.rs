//! Files exchanged between a generation run, the experiment harness, and a
//! later analysis run.
//!
//! The tree artifact holds one line per service:
//!
//! ```text
//! A: dummy3 -> dummy7 -> dummy12
//! B: dummy3
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, ArtifactResult};
use crate::types::NodeId;

pub const TREE_FILE: &str = "services.tree";
pub const FALLBACK_FILE: &str = "fallback.txt";
pub const FALLBACK_RECORD_FILE: &str = "fallback.json";
pub const LOCATIONS_FILE: &str = "locations.json";
pub const NEIGHBORHOODS_FILE: &str = "neighborhoods.json";
pub const SNAPSHOT_EXTENSION: &str = "met";

const HOP_SEPARATOR: &str = " -> ";

/// One service's canonical chain, root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalChain {
    pub service_id: String,
    pub path: Vec<NodeId>,
}

impl CanonicalChain {
    /// Number of nodes on the chain (a zero-hop chain has size 1).
    pub fn size(&self) -> usize {
        self.path.len()
    }

    pub fn root(&self) -> &str {
        &self.path[0]
    }

    /// The local optimum where the descent stopped.
    pub fn terminal(&self) -> &str {
        &self.path[self.path.len() - 1]
    }

    pub fn to_line(&self) -> String {
        format!("{}: {}", self.service_id, self.path.join(HOP_SEPARATOR))
    }
}

/// The root node, as handed to the deployer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub id: NodeId,
    pub addr: String,
}

/// Render chains as the tree artifact, one line per service.
pub fn format_tree_artifact(chains: &[CanonicalChain]) -> String {
    let mut out = String::new();
    for chain in chains {
        out.push_str(&chain.to_line());
        out.push('\n');
    }
    out
}

/// Parse a tree artifact. Blank lines are ignored.
pub fn parse_tree_artifact(text: &str) -> ArtifactResult<Vec<CanonicalChain>> {
    let mut chains = Vec::new();
    let mut services = HashSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let malformed = |reason: &str| ArtifactError::MalformedTree {
            line,
            reason: reason.to_string(),
        };

        let (service, hops) = raw.split_once(':').ok_or_else(|| malformed("missing ':'"))?;
        let service_id = service.trim();
        if service_id.is_empty() {
            return Err(malformed("empty service id"));
        }

        let mut path = Vec::new();
        let mut seen = HashSet::new();
        for hop in hops.split("->") {
            let node = hop.trim();
            if node.is_empty() {
                return Err(malformed("empty node id"));
            }
            if !seen.insert(node) {
                return Err(malformed(&format!("node {node} repeats")));
            }
            path.push(node.to_string());
        }

        if !services.insert(service_id.to_string()) {
            return Err(ArtifactError::DuplicateService(service_id.to_string()));
        }
        chains.push(CanonicalChain {
            service_id: service_id.to_string(),
            path,
        });
    }

    if chains.is_empty() {
        return Err(ArtifactError::EmptyTree);
    }
    Ok(chains)
}

pub fn read_tree_artifact(path: &Path) -> ArtifactResult<Vec<CanonicalChain>> {
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tree_artifact(&text)
}

/// Read the root id from the first line of a fallback file.
pub fn read_fallback(path: &Path) -> ArtifactResult<NodeId> {
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root = text.lines().next().unwrap_or("").trim();
    if root.is_empty() {
        return Err(ArtifactError::EmptyRoot(path.to_path_buf()));
    }
    Ok(root.to_string())
}
