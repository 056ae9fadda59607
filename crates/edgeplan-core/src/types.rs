//! Shared types used across edgeplan crates.

use serde::{Deserialize, Serialize};

/// Node identifiers are plain strings (`dummy1`, `node21`, ...).
pub type NodeId = String;

/// A point on the map.
///
/// Under [`DistanceMetric::GreatCircle`] the pair is latitude/longitude in
/// degrees. Under [`DistanceMetric::Euclidean`] the same pair is read as
/// planar `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const ORIGIN: Location = Location { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// How distances between locations are measured for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMetric {
    /// Angular distance on the unit sphere, in radians.
    #[default]
    GreatCircle,
    /// Straight-line distance in the plane.
    Euclidean,
}

impl DistanceMetric {
    pub fn label(&self) -> &'static str {
        match self {
            DistanceMetric::GreatCircle => "great-circle",
            DistanceMetric::Euclidean => "euclidean",
        }
    }
}

/// A node of the simulated topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Address reported to the runtime agent. Defaults to the id.
    pub addr: String,
    pub location: Location,
    /// Visible nodes, in enumeration order. Never contains `id`.
    pub neighbors: Vec<NodeId>,
}

/// A service to place, with its client location and the attributes used to
/// seed downstream metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub target: Location,
    pub processing_time: u32,
    pub client_latency: u32,
}
