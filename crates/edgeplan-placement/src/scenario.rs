//! Scenario files for the experiment harness.
//!
//! A scenario fixes node locations, the fallback node, and optionally a
//! node-to-node latency matrix derived from coarse map regions:
//!
//! ```text
//! { "locations": { "dummy1": { "lat": 3.0, "lng": -7.0 } },
//!   "fallback": "dummy1",
//!   "latencies": [[0.0]] }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use edgeplan_core::geo::location_token_at_level;
use edgeplan_core::{DistanceMetric, Location, NodeId};
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::topology::{GeoBounds, Topology, node_ids};

pub const SCENARIO_NODE_PREFIX: &str = "dummy";

/// Cell level used to look up a node's region.
pub const REGION_CELL_LEVEL: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    /// Node order; rows and columns of `latencies` follow it.
    #[serde(skip)]
    pub nodes: Vec<NodeId>,
    pub locations: BTreeMap<NodeId, Location>,
    pub fallback: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latencies: Option<Vec<Vec<f64>>>,
}

impl Scenario {
    /// Attach the region-derived latency matrix.
    pub fn with_latencies(mut self, tables: &RegionTables) -> PlacementResult<Self> {
        self.latencies = Some(tables.latency_matrix(&self)?);
        Ok(self)
    }

    pub fn write(&self, path: &Path) -> PlacementResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PlacementError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let encoded = serde_json::to_string(self).map_err(|source| PlacementError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, encoded).map_err(|source| PlacementError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            fallback = %self.fallback,
            latencies = self.latencies.is_some(),
            "wrote scenario"
        );
        Ok(())
    }
}

/// `count` nodes at random integer locations; the fallback is the node
/// closest to the origin.
pub fn random_scenario<R: Rng + ?Sized>(count: usize, rng: &mut R) -> PlacementResult<Scenario> {
    let ids = node_ids(SCENARIO_NODE_PREFIX, count);
    let bounds = GeoBounds::default();
    let topology = Topology::random(&ids, 0, &bounds, DistanceMetric::GreatCircle, rng)?;
    let fallback = topology.root_candidate().id.clone();
    let locations = topology
        .nodes()
        .iter()
        .map(|n| (n.id.clone(), n.location))
        .collect();
    Ok(Scenario {
        nodes: ids,
        locations,
        fallback,
        latencies: None,
    })
}

/// Read the first `count` entries of a map node list (`<n> <lat> <lng>` per
/// line). Nodes are named `dummy<n>`; the fallback is `dummy<fallback>`.
pub fn parse_map(text: &str, count: usize, fallback: &str) -> PlacementResult<Scenario> {
    let mut nodes = Vec::with_capacity(count);
    let mut locations = BTreeMap::new();

    for (idx, line) in text.lines().enumerate() {
        if nodes.len() >= count {
            break;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let malformed = |reason: &str| {
            PlacementError::Scenario(format!("map line {}: {reason}", idx + 1))
        };
        let [number, lat, lng] = fields[..] else {
            return Err(malformed("expected `<n> <lat> <lng>`"));
        };
        let lat: f64 = lat.parse().map_err(|_| malformed("latitude is not a number"))?;
        let lng: f64 = lng.parse().map_err(|_| malformed("longitude is not a number"))?;

        let id = format!("{SCENARIO_NODE_PREFIX}{number}");
        if locations.insert(id.clone(), Location::new(lat, lng)).is_some() {
            return Err(PlacementError::DuplicateNode(id));
        }
        nodes.push(id);
    }

    if nodes.is_empty() {
        return Err(PlacementError::EmptyTopology);
    }
    if nodes.len() < count {
        warn!(requested = count, available = nodes.len(), "map has fewer nodes than requested");
    }

    let fallback = format!("{SCENARIO_NODE_PREFIX}{fallback}");
    if !locations.contains_key(&fallback) {
        return Err(PlacementError::UnknownFallback(fallback));
    }

    Ok(Scenario {
        nodes,
        locations,
        fallback,
        latencies: None,
    })
}

pub fn load_map(path: &Path, count: usize, fallback: &str) -> PlacementResult<Scenario> {
    let text = std::fs::read_to_string(path).map_err(|source| PlacementError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario = parse_map(&text, count, fallback)?;
    debug!(path = %path.display(), nodes = scenario.nodes.len(), "loaded map");
    Ok(scenario)
}

/// Region lookup tables: coarse cell token to region, and region pair to
/// one-way delay.
#[derive(Debug, Clone, Default)]
pub struct RegionTables {
    cells_to_region: HashMap<String, String>,
    region_delays: HashMap<String, HashMap<String, f64>>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> PlacementResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| PlacementError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| PlacementError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

impl RegionTables {
    pub fn new(
        cells_to_region: HashMap<String, String>,
        region_delays: HashMap<String, HashMap<String, f64>>,
    ) -> Self {
        Self {
            cells_to_region,
            region_delays,
        }
    }

    pub fn load(cells_to_region: &Path, region_delays: &Path) -> PlacementResult<Self> {
        Ok(Self::new(read_json(cells_to_region)?, read_json(region_delays)?))
    }

    pub fn region_of(&self, location: &Location) -> PlacementResult<&str> {
        let token = location_token_at_level(location, REGION_CELL_LEVEL);
        self.cells_to_region
            .get(&token)
            .map(String::as_str)
            .ok_or_else(|| PlacementError::Scenario(format!("cell {token} has no region")))
    }

    pub fn delay(&self, from: &str, to: &str) -> PlacementResult<f64> {
        self.region_delays
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .ok_or_else(|| PlacementError::Scenario(format!("no delay from region {from} to {to}")))
    }

    /// Square matrix in scenario node order, zero on the diagonal.
    pub fn latency_matrix(&self, scenario: &Scenario) -> PlacementResult<Vec<Vec<f64>>> {
        let mut regions = Vec::with_capacity(scenario.nodes.len());
        for id in &scenario.nodes {
            let location = scenario
                .locations
                .get(id)
                .ok_or_else(|| PlacementError::UnknownNode(id.clone()))?;
            regions.push(self.region_of(location)?);
        }

        let distinct: HashSet<&str> = regions.iter().copied().collect();
        debug!(nodes = regions.len(), regions = distinct.len(), "building latency matrix");

        let mut matrix = Vec::with_capacity(regions.len());
        for (i, from) in regions.iter().enumerate() {
            let mut row = Vec::with_capacity(regions.len());
            for (j, to) in regions.iter().enumerate() {
                row.push(if i == j { 0.0 } else { self.delay(from, to)? });
            }
            matrix.push(row);
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const MAP: &str = "1 38.72 -9.14\n2 40.41 -3.70\n\n3 -33.86 151.21\n4 35.68 139.69\n";

    fn tables_for(scenario: &Scenario) -> RegionTables {
        // Europe nodes map to one region, everything else to another.
        let mut cells = HashMap::new();
        for id in &scenario.nodes {
            let loc = scenario.locations[id];
            let region = if loc.lng < 0.0 { "eu" } else { "ap" };
            cells.insert(location_token_at_level(&loc, REGION_CELL_LEVEL), region.to_string());
        }
        let mut delays = HashMap::new();
        delays.insert(
            "eu".to_string(),
            HashMap::from([("eu".to_string(), 5.0), ("ap".to_string(), 120.0)]),
        );
        delays.insert(
            "ap".to_string(),
            HashMap::from([("eu".to_string(), 125.0), ("ap".to_string(), 8.0)]),
        );
        RegionTables::new(cells, delays)
    }

    #[test]
    fn random_scenario_picks_node_nearest_origin() {
        let scenario = random_scenario(15, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(scenario.nodes.len(), 15);
        assert_eq!(scenario.locations.len(), 15);
        assert!(scenario.nodes.contains(&scenario.fallback));

        let d = |id: &str| {
            edgeplan_core::geo::great_circle(&scenario.locations[id], &Location::ORIGIN)
        };
        let best = d(&scenario.fallback);
        assert!(scenario.nodes.iter().all(|id| d(id) >= best));
    }

    #[test]
    fn map_reads_first_count_entries() {
        let scenario = parse_map(MAP, 3, "2").unwrap();
        assert_eq!(scenario.nodes, vec!["dummy1", "dummy2", "dummy3"]);
        assert_eq!(scenario.locations["dummy3"], Location::new(-33.86, 151.21));
        assert_eq!(scenario.fallback, "dummy2");
    }

    #[test]
    fn map_fallback_must_be_loaded() {
        let err = parse_map(MAP, 2, "4").unwrap_err();
        assert!(matches!(err, PlacementError::UnknownFallback(id) if id == "dummy4"));
    }

    #[test]
    fn map_rejects_malformed_lines() {
        let err = parse_map("1 10.0\n", 1, "1").unwrap_err();
        assert!(matches!(err, PlacementError::Scenario(msg) if msg.contains("line 1")));

        let err = parse_map("1 north 3\n", 1, "1").unwrap_err();
        assert!(matches!(err, PlacementError::Scenario(_)));
    }

    #[test]
    fn latency_matrix_follows_regions() {
        let scenario = parse_map(MAP, 4, "1").unwrap();
        let tables = tables_for(&scenario);
        let scenario = scenario.with_latencies(&tables).unwrap();
        let m = scenario.latencies.as_ref().unwrap();

        assert_eq!(m.len(), 4);
        for (i, row) in m.iter().enumerate() {
            assert_eq!(row.len(), 4);
            assert_eq!(row[i], 0.0);
        }
        assert_eq!(m[0][1], 5.0);
        assert_eq!(m[0][2], 120.0);
        assert_eq!(m[2][0], 125.0);
        assert_eq!(m[2][3], 8.0);
    }

    #[test]
    fn missing_region_is_an_error() {
        let scenario = parse_map(MAP, 2, "1").unwrap();
        let err = RegionTables::default().latency_matrix(&scenario).unwrap_err();
        assert!(matches!(err, PlacementError::Scenario(msg) if msg.contains("has no region")));
    }

    #[test]
    fn written_scenario_omits_absent_latencies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scenario.json");
        parse_map(MAP, 2, "1").unwrap().write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["fallback"], "dummy1");
        assert_eq!(value["locations"]["dummy2"]["lat"], 40.41);
        assert!(value.get("latencies").is_none());
        assert!(value.get("nodes").is_none());
    }

    #[test]
    fn tables_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let cells = dir.path().join("cells.json");
        let delays = dir.path().join("delays.json");
        let token = location_token_at_level(&Location::ORIGIN, REGION_CELL_LEVEL);
        std::fs::write(&cells, format!(r#"{{"{token}": "eu"}}"#)).unwrap();
        std::fs::write(&delays, r#"{"eu": {"eu": 3}}"#).unwrap();

        let tables = RegionTables::load(&cells, &delays).unwrap();
        assert_eq!(tables.region_of(&Location::ORIGIN).unwrap(), "eu");
        assert_eq!(tables.delay("eu", "eu").unwrap(), 3.0);

        std::fs::write(&delays, "not json").unwrap();
        assert!(matches!(
            RegionTables::load(&cells, &delays),
            Err(PlacementError::Decode { .. })
        ));
    }
}
