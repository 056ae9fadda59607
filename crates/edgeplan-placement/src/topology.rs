//! Topology model: node locations, visible neighbourhoods, distances.
//!
//! A topology is either generated (uniform random integer coordinates,
//! k-nearest neighbourhoods) or loaded from a node config with explicit
//! adjacency. Either way the neighbour sets are fixed once built.

use std::collections::HashMap;

use edgeplan_core::geo;
use edgeplan_core::{DistanceMetric, Location, Node, NodeId};
use rand::Rng;
use tracing::debug;

use crate::error::{PlacementError, PlacementResult};

/// Inclusive integer bounds for generated coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoBounds {
    pub min_lat: i32,
    pub max_lat: i32,
    pub min_lng: i32,
    pub max_lng: i32,
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self {
            min_lat: -90,
            max_lat: 90,
            min_lng: -180,
            max_lng: 180,
        }
    }
}

/// Draw a location with integer coordinates inside `bounds`.
pub fn random_location<R: Rng + ?Sized>(rng: &mut R, bounds: &GeoBounds) -> Location {
    let lat = rng.gen_range(bounds.min_lat..=bounds.max_lat);
    let lng = rng.gen_range(bounds.min_lng..=bounds.max_lng);
    Location::new(f64::from(lat), f64::from(lng))
}

/// Node ids `<prefix>1 ..= <prefix><count>`.
pub fn node_ids(prefix: &str, count: usize) -> Vec<NodeId> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}

/// How a topology is obtained for each generation attempt.
#[derive(Debug, Clone)]
pub enum TopologySource {
    Random {
        node_ids: Vec<NodeId>,
        neighborhood_size: usize,
        bounds: GeoBounds,
    },
    Loaded(Vec<Node>),
}

impl TopologySource {
    pub fn build<R: Rng + ?Sized>(
        &self,
        metric: DistanceMetric,
        rng: &mut R,
    ) -> PlacementResult<Topology> {
        match self {
            TopologySource::Random {
                node_ids,
                neighborhood_size,
                bounds,
            } => Topology::random(node_ids, *neighborhood_size, bounds, metric, rng),
            TopologySource::Loaded(nodes) => Topology::from_nodes(nodes.clone(), metric),
        }
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, TopologySource::Random { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    metric: DistanceMetric,
    explicit_adjacency: bool,
}

impl Topology {
    /// Place every node at a random location and give each one its
    /// `neighborhood_size` nearest peers as neighbours.
    pub fn random<R: Rng + ?Sized>(
        node_ids: &[NodeId],
        neighborhood_size: usize,
        bounds: &GeoBounds,
        metric: DistanceMetric,
        rng: &mut R,
    ) -> PlacementResult<Self> {
        let nodes = node_ids
            .iter()
            .map(|id| Node {
                id: id.clone(),
                addr: id.clone(),
                location: random_location(rng, bounds),
                neighbors: Vec::new(),
            })
            .collect();

        let mut topology = Self::assemble(nodes, metric, false)?;
        let neighborhoods: Vec<Vec<NodeId>> = (0..topology.nodes.len())
            .map(|i| topology.k_nearest(i, neighborhood_size))
            .collect();
        for (node, neighbors) in topology.nodes.iter_mut().zip(neighborhoods) {
            node.neighbors = neighbors;
        }

        debug!(
            nodes = topology.nodes.len(),
            neighborhood_size,
            metric = metric.label(),
            "generated random topology"
        );
        Ok(topology)
    }

    /// Use nodes with explicit locations and adjacency lists as-is.
    pub fn from_nodes(nodes: Vec<Node>, metric: DistanceMetric) -> PlacementResult<Self> {
        let topology = Self::assemble(nodes, metric, true)?;
        for node in &topology.nodes {
            for neighbor in &node.neighbors {
                if neighbor == &node.id || !topology.index.contains_key(neighbor) {
                    return Err(PlacementError::UnknownNode(neighbor.clone()));
                }
            }
        }
        Ok(topology)
    }

    fn assemble(
        nodes: Vec<Node>,
        metric: DistanceMetric,
        explicit_adjacency: bool,
    ) -> PlacementResult<Self> {
        if nodes.is_empty() {
            return Err(PlacementError::EmptyTopology);
        }
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(PlacementError::DuplicateNode(node.id.clone()));
            }
        }
        Ok(Self {
            nodes,
            index,
            metric,
            explicit_adjacency,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn has_explicit_adjacency(&self) -> bool {
        self.explicit_adjacency
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> PlacementResult<&Node> {
        self.index
            .get(id)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| PlacementError::UnknownNode(id.to_string()))
    }

    /// The fixed visible set of `id`.
    pub fn neighbors(&self, id: &str) -> PlacementResult<&[NodeId]> {
        Ok(&self.node(id)?.neighbors)
    }

    /// The `k` nearest other nodes of `id`, or the loaded adjacency list
    /// verbatim when the topology came from a node config.
    pub fn neighborhood(&self, id: &str, k: usize) -> PlacementResult<Vec<NodeId>> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| PlacementError::UnknownNode(id.to_string()))?;
        if self.explicit_adjacency {
            return Ok(self.nodes[i].neighbors.clone());
        }
        Ok(self.k_nearest(i, k))
    }

    /// Ties keep enumeration order.
    fn k_nearest(&self, i: usize, k: usize) -> Vec<NodeId> {
        let origin = &self.nodes[i].location;
        let mut others: Vec<(f64, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, n)| (geo::distance(self.metric, origin, &n.location), j))
            .collect();
        others.sort_by(|a, b| a.0.total_cmp(&b.0));
        others
            .into_iter()
            .take(k)
            .map(|(_, j)| self.nodes[j].id.clone())
            .collect()
    }

    pub fn distance(&self, a: &str, b: &str) -> PlacementResult<f64> {
        let a = self.node(a)?;
        let b = self.node(b)?;
        Ok(geo::distance(self.metric, &a.location, &b.location))
    }

    pub fn distance_to(&self, id: &str, target: &Location) -> PlacementResult<f64> {
        Ok(geo::distance(self.metric, &self.node(id)?.location, target))
    }

    /// The node closest to the origin; first in enumeration order on ties.
    pub fn root_candidate(&self) -> &Node {
        let mut best = &self.nodes[0];
        let mut best_distance = geo::distance(self.metric, &best.location, &Location::ORIGIN);
        for node in &self.nodes[1..] {
            let d = geo::distance(self.metric, &node.location, &Location::ORIGIN);
            if d < best_distance {
                best = node;
                best_distance = d;
            }
        }
        best
    }
}
