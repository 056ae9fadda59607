//! Writes a generation run's artifacts into one output directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use edgeplan_core::artifact::{
    FALLBACK_FILE, FALLBACK_RECORD_FILE, LOCATIONS_FILE, NEIGHBORHOODS_FILE, SNAPSHOT_EXTENSION,
    TREE_FILE, format_tree_artifact,
};
use edgeplan_core::{FallbackRecord, Location, NodeId};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PlacementError, PlacementResult};
use crate::planner::PlacementInstance;
use crate::snapshot;

/// Paths of everything written for one instance.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenArtifacts {
    pub tree: PathBuf,
    pub fallback: PathBuf,
    pub fallback_record: PathBuf,
    pub locations: PathBuf,
    pub neighborhoods: PathBuf,
    pub snapshots: Vec<PathBuf>,
}

#[derive(Serialize)]
struct LocationsFile<'a> {
    services: BTreeMap<&'a str, Location>,
    nodes: BTreeMap<&'a str, Location>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PlacementError {
    let path = path.to_path_buf();
    move |source| PlacementError::Io { path, source }
}

fn write_text(path: PathBuf, contents: &str) -> PlacementResult<PathBuf> {
    std::fs::write(&path, contents).map_err(io_error(&path))?;
    debug!(path = %path.display(), "wrote artifact");
    Ok(path)
}

fn encode_json<T: Serialize>(path: PathBuf, value: &T) -> PlacementResult<(PathBuf, String)> {
    match serde_json::to_string_pretty(value) {
        Ok(encoded) => Ok((path, encoded)),
        Err(source) => Err(PlacementError::Encode { path, source }),
    }
}

/// Node ids become `<id>.met` file names, so they must name a single
/// entry inside the output directory.
fn check_node_id(id: &str) -> PlacementResult<()> {
    let bad = id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']);
    if bad {
        return Err(PlacementError::InvalidNodeId(id.to_string()));
    }
    Ok(())
}

/// Remove snapshot files left by an earlier run. Other files are kept.
fn clear_stale_snapshots(dir: &Path) -> PlacementResult<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        let is_snapshot = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION);
        if is_snapshot {
            std::fs::remove_file(&path).map_err(io_error(&path))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write snapshots, the tree artifact, the fallback files and the
/// visualizer files for `instance` into `dir`, creating it if needed.
///
/// Every node id is checked and every file is encoded before `dir` is
/// touched, so a bad instance leaves an earlier run's output in place.
/// The write itself is not atomic: an IO failure midway can leave a
/// partial set of files behind.
pub fn write_artifacts(
    dir: &Path,
    instance: &PlacementInstance,
) -> PlacementResult<WrittenArtifacts> {
    let mut snapshots = Vec::with_capacity(instance.topology.len());
    for (node_id, record) in snapshot::snapshots(&instance.topology, &instance.services)? {
        check_node_id(&node_id)?;
        let path = dir.join(format!("{node_id}.{SNAPSHOT_EXTENSION}"));
        snapshots.push(encode_json(path, &record)?);
    }

    let root = instance.topology.node(&instance.root)?;
    let fallback_record = encode_json(
        dir.join(FALLBACK_RECORD_FILE),
        &FallbackRecord {
            id: root.id.clone(),
            addr: root.addr.clone(),
        },
    )?;

    let locations = encode_json(
        dir.join(LOCATIONS_FILE),
        &LocationsFile {
            services: instance
                .services
                .iter()
                .map(|s| (s.id.as_str(), s.target))
                .collect(),
            nodes: instance
                .topology
                .nodes()
                .iter()
                .map(|n| (n.id.as_str(), n.location))
                .collect(),
        },
    )?;

    let neighborhoods: BTreeMap<&str, &[NodeId]> = instance
        .topology
        .nodes()
        .iter()
        .map(|n| (n.id.as_str(), n.neighbors.as_slice()))
        .collect();
    let neighborhoods = encode_json(dir.join(NEIGHBORHOODS_FILE), &neighborhoods)?;

    std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    let removed = clear_stale_snapshots(dir)?;
    if removed > 0 {
        debug!(removed, dir = %dir.display(), "removed stale snapshots");
    }

    let snapshot_paths = snapshots
        .into_iter()
        .map(|(path, encoded)| write_text(path, &encoded))
        .collect::<PlacementResult<Vec<_>>>()?;
    let tree = write_text(dir.join(TREE_FILE), &format_tree_artifact(&instance.trees))?;
    let fallback = write_text(dir.join(FALLBACK_FILE), &format!("{}\n", root.id))?;
    let (path, encoded) = fallback_record;
    let fallback_record = write_text(path, &encoded)?;
    let (path, encoded) = locations;
    let locations = write_text(path, &encoded)?;
    let (path, encoded) = neighborhoods;
    let neighborhoods = write_text(path, &encoded)?;

    info!(
        dir = %dir.display(),
        snapshots = snapshot_paths.len(),
        "wrote generation artifacts"
    );

    Ok(WrittenArtifacts {
        tree,
        fallback,
        fallback_record,
        locations,
        neighborhoods,
        snapshots: snapshot_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{GenerationPlan, SizeConstraints, generate};
    use crate::services::ServiceSource;
    use crate::topology::{GeoBounds, Topology, TopologySource, node_ids};
    use edgeplan_core::{CanonicalChain, DistanceMetric, Node, Service};
    use edgeplan_core::artifact::{read_fallback, read_tree_artifact};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn instance() -> PlacementInstance {
        let plan = GenerationPlan {
            topology: TopologySource::Random {
                node_ids: node_ids("dummy", 12),
                neighborhood_size: 2,
                bounds: GeoBounds::default(),
            },
            services: ServiceSource::Random {
                ids: vec!["A".to_string(), "B".to_string()],
            },
            metric: DistanceMetric::GreatCircle,
            fallback: None,
            constraints: SizeConstraints::default(),
        };
        generate(&plan, &mut StdRng::seed_from_u64(17)).unwrap()
    }

    #[test]
    fn writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let instance = instance();
        let written = write_artifacts(dir.path(), &instance).unwrap();

        assert_eq!(written.snapshots.len(), 12);
        assert!(dir.path().join("dummy1.met").is_file());

        let chains = read_tree_artifact(&written.tree).unwrap();
        assert_eq!(chains, instance.trees);
        assert_eq!(read_fallback(&written.fallback).unwrap(), instance.root);

        let record: FallbackRecord =
            serde_json::from_str(&std::fs::read_to_string(&written.fallback_record).unwrap())
                .unwrap();
        assert_eq!(record.id, instance.root);

        let locations: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written.locations).unwrap()).unwrap();
        assert_eq!(locations["nodes"].as_object().unwrap().len(), 12);
        assert_eq!(locations["services"].as_object().unwrap().len(), 2);

        let neighborhoods: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&std::fs::read_to_string(&written.neighborhoods).unwrap())
                .unwrap();
        assert_eq!(neighborhoods["dummy3"].len(), 2);
    }

    #[test]
    fn stale_snapshots_are_replaced_and_other_files_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old-node.met"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        write_artifacts(dir.path(), &instance()).unwrap();

        assert!(!dir.path().join("old-node.met").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn node_ids_must_be_plain_file_names() {
        for id in ["a/b", "..", "c\\d", ""] {
            assert!(
                matches!(check_node_id(id), Err(PlacementError::InvalidNodeId(_))),
                "{id:?} accepted"
            );
        }
        check_node_id("dummy1").unwrap();
        check_node_id("node.eu-1").unwrap();
    }

    #[test]
    fn escaping_node_id_is_rejected_before_touching_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old-node.met"), "{}").unwrap();

        let node = |id: &str, x: f64, neighbor: &str| Node {
            id: id.to_string(),
            addr: id.to_string(),
            location: Location::new(x, 0.0),
            neighbors: vec![neighbor.to_string()],
        };
        let topology = Topology::from_nodes(
            vec![node("ok", 0.0, "../evil"), node("../evil", 1.0, "ok")],
            DistanceMetric::Euclidean,
        )
        .unwrap();
        let instance = PlacementInstance {
            topology,
            services: vec![Service {
                id: "A".to_string(),
                target: Location::new(1.0, 0.0),
                processing_time: 1,
                client_latency: 100,
            }],
            root: "ok".to_string(),
            trees: vec![CanonicalChain {
                service_id: "A".to_string(),
                path: vec!["ok".to_string(), "../evil".to_string()],
            }],
            attempts: 1,
        };

        let err = write_artifacts(&dir.path().join("out"), &instance).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidNodeId(id) if id == "../evil"));
        assert!(!dir.path().join("evil.met").exists());
        assert!(!dir.path().join("out").exists());

        let err = write_artifacts(dir.path(), &instance).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidNodeId(_)));
        assert!(dir.path().join("old-node.met").is_file());
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("build").join("metrics");
        write_artifacts(&nested, &instance()).unwrap();
        assert!(nested.join(TREE_FILE).is_file());
    }
}
