//! Deviation of an observed deployment graph from the canonical chains.
//!
//! Walking from the root along each canonical chain, every observed child
//! that is not the chain's next hop starts an off-path subtree. Everything
//! reachable from it over observed edges counts as an extra node. The
//! fan-out seen just before the chain's terminal node is the deployment's
//! load balance factor.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;

use edgeplan_core::{CanonicalChain, NodeId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::report::{DeploymentDeviation, DeviationReport};

/// One deployment's observed edges: node to the children it forwarded to.
pub type ObservedDeployment = BTreeMap<NodeId, Vec<NodeId>>;

/// Observed results of a live run, keyed by deployment id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedGraph {
    deployments: BTreeMap<String, ObservedDeployment>,
}

impl ObservedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> AnalyzerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AnalyzerError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn deployment(&self, id: &str) -> Option<&ObservedDeployment> {
        self.deployments.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, edges: ObservedDeployment) {
        self.deployments.insert(id.into(), edges);
    }

    pub fn deployment_ids(&self) -> impl Iterator<Item = &str> {
        self.deployments.keys().map(String::as_str)
    }
}

/// A canonical chain as a next-hop map.
#[derive(Debug, Clone, Default)]
pub struct OptimalChain {
    next_hop: HashMap<NodeId, NodeId>,
    members: HashSet<NodeId>,
}

impl OptimalChain {
    pub fn from_path(path: &[NodeId]) -> Self {
        let next_hop = path
            .windows(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        Self {
            next_hop,
            members: path.iter().cloned().collect(),
        }
    }

    pub fn next_hop(&self, node: &str) -> Option<&str> {
        self.next_hop.get(node).map(String::as_str)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.members.contains(node)
    }

    /// On the chain with nowhere further to go.
    pub fn is_terminal(&self, node: &str) -> bool {
        self.contains(node) && !self.next_hop.contains_key(node)
    }
}

impl From<&CanonicalChain> for OptimalChain {
    fn from(chain: &CanonicalChain) -> Self {
        Self::from_path(&chain.path)
    }
}

/// Breadth-first over observed edges from `start`, adding every newly
/// visited node to `extra`. Chain nodes are neither added nor crossed.
fn explore_off_path(
    start: &str,
    observed: &ObservedDeployment,
    chain: &OptimalChain,
    explored: &mut HashSet<NodeId>,
    extra: &mut BTreeSet<NodeId>,
) {
    if chain.contains(start) || !explored.insert(start.to_string()) {
        return;
    }

    let mut frontier = VecDeque::from([start.to_string()]);
    while let Some(node) = frontier.pop_front() {
        for child in observed.get(&node).into_iter().flatten() {
            if chain.contains(child) || !explored.insert(child.clone()) {
                continue;
            }
            frontier.push_back(child.clone());
        }
        extra.insert(node);
    }
}

/// Compare one deployment's observed edges with its canonical chain.
pub fn analyze_deployment(
    deployment_id: &str,
    root: &str,
    chain: &OptimalChain,
    observed: &ObservedDeployment,
) -> DeploymentDeviation {
    let mut load_balance_factor = 1;
    let mut extra_nodes = BTreeSet::new();
    let mut explored = HashSet::new();
    let mut current = root;

    while let Some(children) = observed.get(current) {
        let next = chain.next_hop(current);

        for child in children {
            if next != Some(child.as_str()) {
                explore_off_path(child, observed, chain, &mut explored, &mut extra_nodes);
            }
        }

        let Some(next) = next else {
            break;
        };
        if chain.is_terminal(next) {
            load_balance_factor = children.len().max(1);
        }
        current = next;
    }

    debug!(
        deployment = deployment_id,
        load_balance_factor,
        extra = extra_nodes.len(),
        "analyzed deployment"
    );

    DeploymentDeviation {
        deployment_id: deployment_id.to_string(),
        load_balance_factor,
        extra_nodes,
    }
}

/// Analyze every deployment of the canonical tree, in tree order.
///
/// Every deployment in `chains` must have observed results. Observed
/// deployments without a canonical chain are ignored.
pub fn analyze(
    root: &str,
    chains: &[CanonicalChain],
    observed: &ObservedGraph,
) -> AnalyzerResult<DeviationReport> {
    let mut deployments = Vec::with_capacity(chains.len());
    for chain in chains {
        let edges = observed
            .deployment(&chain.service_id)
            .ok_or_else(|| AnalyzerError::MissingDeployment(chain.service_id.clone()))?;
        deployments.push(analyze_deployment(
            &chain.service_id,
            root,
            &OptimalChain::from(chain),
            edges,
        ));
    }

    for id in observed.deployment_ids() {
        if !chains.iter().any(|c| c.service_id == id) {
            warn!(deployment = id, "observed deployment has no canonical chain; ignoring");
        }
    }

    Ok(DeviationReport::new(root, deployments))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(nodes: &[&str]) -> OptimalChain {
        let path: Vec<NodeId> = nodes.iter().map(|n| n.to_string()).collect();
        OptimalChain::from_path(&path)
    }

    fn observed(edges: &[(&str, &[&str])]) -> ObservedDeployment {
        edges
            .iter()
            .map(|(node, children)| {
                (
                    node.to_string(),
                    children.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect()
    }

    fn set(nodes: &[&str]) -> BTreeSet<NodeId> {
        nodes.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn chain_next_hops() {
        let c = chain(&["A", "B", "C"]);
        assert_eq!(c.next_hop("A"), Some("B"));
        assert_eq!(c.next_hop("C"), None);
        assert!(c.is_terminal("C"));
        assert!(!c.is_terminal("B"));
        assert!(!c.is_terminal("Z"));
    }

    #[test]
    fn exact_match_has_no_deviation() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B", "C"]),
            &observed(&[("A", &["B"]), ("B", &["C"])]),
        );
        assert!(result.extra_nodes.is_empty());
        assert_eq!(result.load_balance_factor, 1);
    }

    #[test]
    fn side_branch_at_root_is_extra() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B", "C", "D"]),
            &observed(&[("A", &["B", "E"]), ("B", &["C"]), ("C", &["D"])]),
        );
        assert_eq!(result.extra_nodes, set(&["E"]));
        assert_eq!(result.load_balance_factor, 1);
    }

    #[test]
    fn fan_out_before_terminal_sets_load_balance_factor() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B"]),
            &observed(&[("A", &["B", "X", "Y"])]),
        );
        assert_eq!(result.extra_nodes, set(&["X", "Y"]));
        assert_eq!(result.load_balance_factor, 3);
    }

    #[test]
    fn off_path_subtrees_are_explored_fully() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B"]),
            &observed(&[("A", &["B", "X"]), ("X", &["X1", "X2"]), ("X2", &["X3"])]),
        );
        assert_eq!(result.extra_nodes, set(&["X", "X1", "X2", "X3"]));
    }

    #[test]
    fn cycles_are_visited_once() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B"]),
            &observed(&[("A", &["B", "X"]), ("X", &["Y"]), ("Y", &["X", "Z"]), ("Z", &["Y"])]),
        );
        assert_eq!(result.extra_nodes, set(&["X", "Y", "Z"]));
    }

    #[test]
    fn chain_nodes_are_never_extra() {
        // X leads back into the chain; the walk must neither count nor cross B or C.
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B", "C"]),
            &observed(&[("A", &["B", "X"]), ("X", &["C"]), ("B", &["C"]), ("C", &["W"])]),
        );
        assert_eq!(result.extra_nodes, set(&["X", "W"]));
    }

    #[test]
    fn zero_hop_chain_counts_every_root_child() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A"]),
            &observed(&[("A", &["P", "Q"]), ("Q", &["R"])]),
        );
        assert_eq!(result.extra_nodes, set(&["P", "Q", "R"]));
        assert_eq!(result.load_balance_factor, 1);
    }

    #[test]
    fn empty_fan_out_floors_factor_at_one() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B"]),
            &observed(&[("A", &[])]),
        );
        assert_eq!(result.load_balance_factor, 1);
        assert!(result.extra_nodes.is_empty());
    }

    #[test]
    fn walk_stops_where_observations_end() {
        let result = analyze_deployment(
            "svc",
            "A",
            &chain(&["A", "B", "C", "D"]),
            &observed(&[("A", &["B"]), ("C", &["D", "Z"])]),
        );
        assert!(result.extra_nodes.is_empty());
        assert_eq!(result.load_balance_factor, 1);
    }

    #[test]
    fn deployments_share_nothing() {
        let chains = vec![
            CanonicalChain {
                service_id: "A".to_string(),
                path: vec!["r".to_string(), "n1".to_string()],
            },
            CanonicalChain {
                service_id: "B".to_string(),
                path: vec!["r".to_string(), "n2".to_string()],
            },
        ];
        let mut graph = ObservedGraph::new();
        graph.insert("A", observed(&[("r", &["n1", "n2"])]));
        graph.insert("B", observed(&[("r", &["n2"])]));

        let report = analyze("r", &chains, &graph).unwrap();
        assert_eq!(report.deployments[0].extra_nodes, set(&["n2"]));
        assert_eq!(report.deployments[0].load_balance_factor, 2);
        assert!(report.deployments[1].extra_nodes.is_empty());
        assert_eq!(report.avg_load_balance_factor, 1.5);
        assert_eq!(report.avg_extra_nodes, 0.5);
    }

    #[test]
    fn missing_deployment_is_an_error() {
        let chains = vec![CanonicalChain {
            service_id: "A".to_string(),
            path: vec!["r".to_string()],
        }];
        let err = analyze("r", &chains, &ObservedGraph::new()).unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingDeployment(id) if id == "A"));
    }

    #[test]
    fn observed_graph_parses_nested_maps() {
        let graph: ObservedGraph =
            serde_json::from_str(r#"{"A": {"r": ["n1", "n2"], "n1": []}}"#).unwrap();
        let a = graph.deployment("A").unwrap();
        assert_eq!(a["r"], vec!["n1", "n2"]);
        assert!(graph.deployment("B").is_none());
    }
}
