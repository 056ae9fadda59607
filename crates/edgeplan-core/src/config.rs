//! edgeplan.toml configuration parser and JSON input loaders.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{DistanceMetric, Location, Node, NodeId};

/// Default ratio between node count and neighbourhood size.
pub const NODES_PER_NEIGHBOUR: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub seed: Option<u64>,
    pub topology: TopologyConfig,
    pub services: ServicesConfig,
    pub constraints: ConstraintsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub node_count: usize,
    pub prefix: String,
    pub neighborhood_size: Option<usize>,
    pub metric: DistanceMetric,
    pub nodes_file: Option<PathBuf>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            node_count: 20,
            prefix: "dummy".to_string(),
            neighborhood_size: None,
            metric: DistanceMetric::GreatCircle,
            nodes_file: None,
        }
    }
}

impl TopologyConfig {
    /// Neighbourhood size for `node_count` nodes: explicit value, or one
    /// neighbour per twenty nodes (at least one).
    pub fn effective_neighborhood_size(&self, node_count: usize) -> usize {
        self.neighborhood_size
            .unwrap_or_else(|| (node_count / NODES_PER_NEIGHBOUR).max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub names: Vec<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    pub min_tree_size: usize,
    pub at_least_one_tree_size: usize,
    pub max_attempts: u32,
    pub fallback: Option<NodeId>,
}

impl Default for ConstraintsConfig {
    fn default() -> Self {
        Self {
            min_tree_size: 0,
            at_least_one_tree_size: 0,
            max_attempts: 10_000,
            fallback: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("build/metrics"),
        }
    }
}

impl PlannerConfig {
    /// Load a config file. Relative input paths are resolved against the
    /// directory holding the file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: PlannerConfig = toml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.topology.nodes_file.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.services.file.as_mut() {
            resolve(p);
        }
        resolve(&mut self.output.dir);
    }

    /// Scaffold a config for a randomized run over `node_count` nodes.
    pub fn scaffold(node_count: usize, services: &[&str]) -> Self {
        PlannerConfig {
            seed: Some(42),
            topology: TopologyConfig {
                node_count,
                ..TopologyConfig::default()
            },
            services: ServicesConfig {
                names: services.iter().map(|s| s.to_string()).collect(),
                file: None,
            },
            constraints: ConstraintsConfig {
                min_tree_size: 2,
                at_least_one_tree_size: 3,
                ..ConstraintsConfig::default()
            },
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    coords: [f64; 2],
    #[serde(alias = "neighbors")]
    neighbours: Vec<NodeId>,
    addr: Option<String>,
}

/// A service target as declared in a services file. Attributes left out
/// are drawn at random by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub id: String,
    pub location: Location,
    pub processing_time: Option<u32>,
    pub client_latency: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    location: Location,
    processing_time: Option<u32>,
    client_latency: Option<u32>,
}

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: DeserializeOwned>(path: &Path, content: &str) -> ConfigResult<T> {
    serde_json::from_str(content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load nodes with explicit coordinates and adjacency.
///
/// Nodes are returned in id order. Every neighbour must name a node in the
/// file, and no node may list itself or the same neighbour twice.
pub fn load_nodes(path: &Path) -> ConfigResult<Vec<Node>> {
    let content = read(path)?;
    let raw: BTreeMap<NodeId, NodeEntry> = parse_json(path, &content)?;
    nodes_from_entries(path, raw)
}

fn nodes_from_entries(path: &Path, raw: BTreeMap<NodeId, NodeEntry>) -> ConfigResult<Vec<Node>> {
    if raw.is_empty() {
        return Err(ConfigError::EmptyNodeSet(path.to_path_buf()));
    }

    let mut nodes = Vec::with_capacity(raw.len());
    for (id, entry) in &raw {
        let mut seen = HashSet::new();
        for neighbour in &entry.neighbours {
            if neighbour == id {
                return Err(ConfigError::SelfNeighbour(id.clone()));
            }
            if !raw.contains_key(neighbour) {
                return Err(ConfigError::UnknownNeighbour {
                    node: id.clone(),
                    neighbour: neighbour.clone(),
                });
            }
            if !seen.insert(neighbour) {
                return Err(ConfigError::DuplicateNeighbour {
                    node: id.clone(),
                    neighbour: neighbour.clone(),
                });
            }
        }

        nodes.push(Node {
            id: id.clone(),
            addr: entry.addr.clone().unwrap_or_else(|| id.clone()),
            location: Location::new(entry.coords[0], entry.coords[1]),
            neighbors: entry.neighbours.clone(),
        });
    }
    Ok(nodes)
}

/// Load service targets, in id order.
pub fn load_services(path: &Path) -> ConfigResult<Vec<ServiceSpec>> {
    let content = read(path)?;
    let raw: BTreeMap<String, ServiceEntry> = parse_json(path, &content)?;
    if raw.is_empty() {
        return Err(ConfigError::EmptyServiceSet(path.to_path_buf()));
    }

    Ok(raw
        .into_iter()
        .map(|(id, entry)| ServiceSpec {
            id,
            location: entry.location,
            processing_time: entry.processing_time,
            client_latency: entry.client_latency,
        })
        .collect())
}
