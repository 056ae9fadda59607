//! Per-node metric snapshots for the runtime placement agent.
//!
//! The agent matches on key names, so the layout here is fixed:
//!
//! ```text
//! {
//!   "METRIC_NODE_ADDR": "dummy21",
//!   "METRIC_LOCATION": "<cell token>",
//!   "METRIC_LOCATION_VICINITY": { "dummy23": "<cell token>" },
//!   "METRIC_NUMBER_OF_INSTANCES_PER_DEPLOYMENT_A": 0,
//!   "METRIC_LOAD_PER_DEPLOYMENT_A": 0,
//!   "METRIC_LOAD_PER_DEPLOYMENT_A_IN_CHILD_dummy23": 0,
//!   "METRIC_LOAD_PER_DEPLOYMENT_A_IN_CHILDREN": {},
//!   "METRIC_AGG_LOAD_PER_DEPLOYMENT_A_IN_CHILDREN": 0,
//!   "METRIC_CLIENT_LATENCY_PER_DEPLOYMENT_A": 150,
//!   "METRIC_PROCESSING_TIME_PER_DEPLOYMENT_A": 10,
//!   "METRIC_AVERAGE_CLIENT_LOCATION_PER_DEPLOYMENT_A": "<cell token>"
//! }
//! ```

use serde_json::{Map, Value, json};

use edgeplan_core::geo::location_token;
use edgeplan_core::{Node, Service};

use crate::error::PlacementResult;
use crate::topology::Topology;

pub const METRIC_NODE_ADDR: &str = "METRIC_NODE_ADDR";
pub const METRIC_LOCATION: &str = "METRIC_LOCATION";
pub const METRIC_LOCATION_VICINITY: &str = "METRIC_LOCATION_VICINITY";

pub fn number_of_instances_key(deployment: &str) -> String {
    format!("METRIC_NUMBER_OF_INSTANCES_PER_DEPLOYMENT_{deployment}")
}

pub fn load_key(deployment: &str) -> String {
    format!("METRIC_LOAD_PER_DEPLOYMENT_{deployment}")
}

pub fn load_in_child_key(deployment: &str, child: &str) -> String {
    format!("METRIC_LOAD_PER_DEPLOYMENT_{deployment}_IN_CHILD_{child}")
}

pub fn load_in_children_key(deployment: &str) -> String {
    format!("METRIC_LOAD_PER_DEPLOYMENT_{deployment}_IN_CHILDREN")
}

pub fn agg_load_in_children_key(deployment: &str) -> String {
    format!("METRIC_AGG_LOAD_PER_DEPLOYMENT_{deployment}_IN_CHILDREN")
}

pub fn client_latency_key(deployment: &str) -> String {
    format!("METRIC_CLIENT_LATENCY_PER_DEPLOYMENT_{deployment}")
}

pub fn processing_time_key(deployment: &str) -> String {
    format!("METRIC_PROCESSING_TIME_PER_DEPLOYMENT_{deployment}")
}

pub fn average_client_location_key(deployment: &str) -> String {
    format!("METRIC_AVERAGE_CLIENT_LOCATION_PER_DEPLOYMENT_{deployment}")
}

/// Build the snapshot record for one node.
pub fn node_snapshot(
    topology: &Topology,
    node: &Node,
    services: &[Service],
) -> PlacementResult<Map<String, Value>> {
    let mut record = Map::new();
    record.insert(METRIC_NODE_ADDR.to_string(), json!(node.addr));
    record.insert(METRIC_LOCATION.to_string(), json!(location_token(&node.location)));

    let mut vicinity = Map::new();
    for neighbor in &node.neighbors {
        let location = topology.node(neighbor)?.location;
        vicinity.insert(neighbor.clone(), json!(location_token(&location)));
    }
    record.insert(METRIC_LOCATION_VICINITY.to_string(), Value::Object(vicinity));

    for service in services {
        let s = service.id.as_str();
        record.insert(number_of_instances_key(s), json!(0));
        record.insert(load_key(s), json!(0));
        for child in &node.neighbors {
            record.insert(load_in_child_key(s, child), json!(0));
        }
        record.insert(load_in_children_key(s), json!({}));
        record.insert(agg_load_in_children_key(s), json!(0));
        record.insert(client_latency_key(s), json!(service.client_latency));
        record.insert(processing_time_key(s), json!(service.processing_time));
        record.insert(
            average_client_location_key(s),
            json!(location_token(&service.target)),
        );
    }

    Ok(record)
}

/// Snapshot records for every node, in topology order.
pub fn snapshots(
    topology: &Topology,
    services: &[Service],
) -> PlacementResult<Vec<(String, Map<String, Value>)>> {
    topology
        .nodes()
        .iter()
        .map(|node| node_snapshot(topology, node, services).map(|record| (node.id.clone(), record)))
        .collect()
}
