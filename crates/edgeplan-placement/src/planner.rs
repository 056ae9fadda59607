//! Placement planner: canonical trees by greedy nearest descent.
//!
//! For each service the planner walks from the root toward the service's
//! target, moving to whichever of {current, neighbours} is closest to the
//! target until the current node wins. The walk is wrapped in rejection
//! sampling: whole instances (topology + services + trees) are rebuilt
//! until the tree sizes satisfy the caller's constraints.

use edgeplan_core::{CanonicalChain, DistanceMetric, Location, NodeId, Service};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::services::ServiceSource;
use crate::topology::{Topology, TopologySource};

/// Walk from `root` toward `target`.
///
/// Candidates are enumerated as `[current, neighbours...]` and only a
/// strictly closer candidate replaces the incumbent, so ties resolve to the
/// earliest candidate and every move strictly reduces the distance.
pub fn descend(topology: &Topology, root: &str, target: &Location) -> PlacementResult<Vec<NodeId>> {
    let mut current = topology.node(root)?.id.as_str();
    let mut path = vec![current.to_string()];

    loop {
        let mut best = current;
        let mut best_distance = topology.distance_to(current, target)?;
        for candidate in topology.neighbors(current)? {
            let d = topology.distance_to(candidate, target)?;
            if d < best_distance {
                best = candidate.as_str();
                best_distance = d;
            }
        }

        if best == current {
            break;
        }
        path.push(best.to_string());
        current = best;
    }

    Ok(path)
}

/// One tree per service, all rooted at `root`.
pub fn plan_trees(
    topology: &Topology,
    root: &str,
    services: &[Service],
) -> PlacementResult<Vec<CanonicalChain>> {
    services
        .iter()
        .map(|service| -> PlacementResult<CanonicalChain> {
            let path = descend(topology, root, &service.target)?;
            debug!(
                service = %service.id,
                size = path.len(),
                terminal = %path[path.len() - 1],
                "planned service tree"
            );
            Ok(CanonicalChain {
                service_id: service.id.clone(),
                path,
            })
        })
        .collect()
}

/// Tree size requirements checked after every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraints {
    /// Every tree must have at least this many nodes.
    pub min_tree_size: usize,
    /// At least one tree must have this many nodes.
    pub at_least_one_tree_size: usize,
    pub max_attempts: u32,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_tree_size: 0,
            at_least_one_tree_size: 0,
            max_attempts: 10_000,
        }
    }
}

impl SizeConstraints {
    pub fn satisfied_by(&self, trees: &[CanonicalChain]) -> bool {
        let all_large_enough = trees.iter().all(|t| t.size() >= self.min_tree_size);
        let one_large_enough = trees.iter().any(|t| t.size() >= self.at_least_one_tree_size);
        all_large_enough && one_large_enough
    }
}

/// Everything needed to generate an instance.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub topology: TopologySource,
    pub services: ServiceSource,
    pub metric: DistanceMetric,
    /// Root override; defaults to the node closest to the origin.
    pub fallback: Option<NodeId>,
    pub constraints: SizeConstraints,
}

/// An accepted instance: the topology, its services, and their trees.
#[derive(Debug, Clone)]
pub struct PlacementInstance {
    pub topology: Topology,
    pub services: Vec<Service>,
    pub root: NodeId,
    pub trees: Vec<CanonicalChain>,
    pub attempts: u32,
}

impl PlacementInstance {
    pub fn min_tree_size(&self) -> usize {
        self.trees.iter().map(CanonicalChain::size).min().unwrap_or(0)
    }

    pub fn max_tree_size(&self) -> usize {
        self.trees.iter().map(CanonicalChain::size).max().unwrap_or(0)
    }
}

fn choose_root(topology: &Topology, fallback: Option<&str>) -> PlacementResult<NodeId> {
    match fallback {
        Some(id) if topology.contains(id) => Ok(id.to_string()),
        Some(id) => Err(PlacementError::UnknownFallback(id.to_string())),
        None => Ok(topology.root_candidate().id.clone()),
    }
}

/// Build instances from scratch until the size constraints hold.
///
/// Fails with [`PlacementError::MaxAttemptsExceeded`] once
/// `constraints.max_attempts` instances have been rejected, or after the
/// first rejection when nothing in the plan is randomized.
pub fn generate<R: Rng + ?Sized>(
    plan: &GenerationPlan,
    rng: &mut R,
) -> PlacementResult<PlacementInstance> {
    if plan.services.is_empty() {
        return Err(PlacementError::NoServices);
    }

    let constraints = &plan.constraints;
    let deterministic = !plan.topology.is_randomized() && !plan.services.is_randomized();
    let mut attempts = 0;

    while attempts < constraints.max_attempts {
        attempts += 1;

        let topology = plan.topology.build(plan.metric, rng)?;
        let services = plan.services.materialize(rng);
        let root = choose_root(&topology, plan.fallback.as_deref())?;
        let trees = plan_trees(&topology, &root, &services)?;

        let instance = PlacementInstance {
            topology,
            services,
            root,
            trees,
            attempts,
        };
        debug!(
            attempt = attempts,
            min = instance.min_tree_size(),
            max = instance.max_tree_size(),
            "generated instance"
        );

        if constraints.satisfied_by(&instance.trees) {
            info!(
                root = %instance.root,
                attempts,
                services = instance.services.len(),
                "accepted placement instance"
            );
            for tree in &instance.trees {
                info!(
                    service = %tree.service_id,
                    terminal = %tree.terminal(),
                    size = tree.size(),
                    "canonical tree"
                );
            }
            return Ok(instance);
        }

        if deterministic {
            warn!("topology and service targets are fixed; retrying cannot change the trees");
            break;
        }
    }

    Err(PlacementError::MaxAttemptsExceeded {
        attempts,
        min_tree_size: constraints.min_tree_size,
        at_least_one_tree_size: constraints.at_least_one_tree_size,
    })
}
