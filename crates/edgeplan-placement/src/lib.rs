//! edgeplan placement planner: topologies, canonical trees, run artifacts.
//!
//! This crate builds simulated edge topologies and computes, for each
//! service, the canonical chain a greedy placement agent should converge
//! to. It does NOT run the agent. It writes the per-node metric snapshots
//! the agent starts from and the artifacts a later deviation analysis
//! reads back.
//!
//! # Components
//!
//! - **`topology`** - Node locations, neighbourhoods, distances
//! - **`services`** - Service targets and seeded attributes
//! - **`planner`** - Greedy descent and the regeneration loop
//! - **`snapshot`** - Per-node metric records
//! - **`writer`** - Output directory layout
//! - **`scenario`** - Scenario files with optional latency matrices

pub mod error;
pub mod planner;
pub mod scenario;
pub mod services;
pub mod snapshot;
pub mod topology;
pub mod writer;

pub use error::{PlacementError, PlacementResult};
pub use planner::{
    GenerationPlan, PlacementInstance, SizeConstraints, descend, generate, plan_trees,
};
pub use scenario::{RegionTables, Scenario, load_map, parse_map, random_scenario};
pub use services::ServiceSource;
pub use topology::{GeoBounds, Topology, TopologySource, node_ids};
pub use writer::{WrittenArtifacts, write_artifacts};
