use std::path::PathBuf;

use clap::Args;
use edgeplan_placement::{RegionTables, load_map, random_scenario};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Number of nodes
    pub count: usize,
    /// Scenario file to write
    pub output: PathBuf,
    /// Map node list (`<n> <lat> <lng>` per line) instead of random locations
    #[arg(long, requires = "fallback")]
    pub map: Option<PathBuf>,
    /// Fallback node number within the map
    #[arg(long, requires = "map")]
    pub fallback: Option<String>,
    /// Level-1 cell token to region table (JSON)
    #[arg(long, requires = "region_delays")]
    pub cells_to_region: Option<PathBuf>,
    /// Region to region delay table (JSON)
    #[arg(long, requires = "cells_to_region")]
    pub region_delays: Option<PathBuf>,
    /// RNG seed for random locations
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn scenario(args: &ScenarioArgs) -> anyhow::Result<()> {
    let mut scenario = match (&args.map, &args.fallback) {
        (Some(map), Some(fallback)) => load_map(map, args.count, fallback)?,
        (Some(_), None) => anyhow::bail!("--map requires --fallback <node number>"),
        _ => {
            let seed = args.seed.unwrap_or_else(rand::random);
            tracing::info!(seed, "Seeding scenario locations");
            random_scenario(args.count, &mut StdRng::seed_from_u64(seed))?
        }
    };

    match (&args.cells_to_region, &args.region_delays) {
        (Some(cells), Some(delays)) => {
            let tables = RegionTables::load(cells, delays)?;
            scenario = scenario.with_latencies(&tables)?;
        }
        (None, None) => {}
        _ => anyhow::bail!("--cells-to-region and --region-delays must be given together"),
    }

    scenario.write(&args.output)?;
    println!(
        "✓ Wrote scenario with {} nodes (fallback {}) to {}",
        scenario.nodes.len(),
        scenario.fallback,
        args.output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_scenario_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("scen.json");
        let args = ScenarioArgs {
            count: 8,
            output: output.clone(),
            map: None,
            fallback: None,
            cells_to_region: None,
            region_delays: None,
            seed: Some(3),
        };
        scenario(&args).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value["locations"].as_object().unwrap().len(), 8);
        assert!(value["fallback"].as_str().unwrap().starts_with("dummy"));
    }

    #[test]
    fn half_a_latency_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = ScenarioArgs {
            count: 3,
            output: dir.path().join("scen.json"),
            map: None,
            fallback: None,
            cells_to_region: Some(dir.path().join("cells.json")),
            region_delays: None,
            seed: Some(1),
        };
        assert!(scenario(&args).is_err());
    }
}
