use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use edgeplan_core::PlannerConfig;
use edgeplan_core::config::{load_nodes, load_services};
use edgeplan_placement::{
    GenerationPlan, GeoBounds, PlacementInstance, ServiceSource, SizeConstraints, TopologySource,
    generate as generate_instance, node_ids, write_artifacts,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

use super::init::CONFIG_FILE;

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Config file (default: ./edgeplan.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// RNG seed; drawn at random and logged when absent
    #[arg(long)]
    pub seed: Option<u64>,
    /// Every tree must have at least this many nodes
    #[arg(long)]
    pub min: Option<usize>,
    /// At least one tree must have this many nodes
    #[arg(long)]
    pub at_least_one: Option<usize>,
    /// Give up after this many rejected instances
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// Node config JSON with explicit locations and adjacency
    #[arg(long)]
    pub nodes: Option<PathBuf>,
    /// Service config JSON with explicit targets
    #[arg(long)]
    pub services: Option<PathBuf>,
    /// Root node override
    #[arg(long)]
    pub fallback: Option<String>,
    /// Output directory for run artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlannerConfig> {
    match path {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None if Path::new(CONFIG_FILE).exists() => PlannerConfig::from_file(Path::new(CONFIG_FILE))
            .with_context(|| format!("loading {CONFIG_FILE}")),
        None => {
            tracing::info!("No {CONFIG_FILE} found, using defaults");
            Ok(PlannerConfig::default())
        }
    }
}

/// Fold flag overrides into the config.
fn apply_overrides(config: &mut PlannerConfig, args: &GenerateArgs) {
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(min) = args.min {
        config.constraints.min_tree_size = min;
    }
    if let Some(n) = args.at_least_one {
        config.constraints.at_least_one_tree_size = n;
    }
    if let Some(n) = args.max_attempts {
        config.constraints.max_attempts = n;
    }
    if let Some(nodes) = &args.nodes {
        config.topology.nodes_file = Some(nodes.clone());
    }
    if let Some(services) = &args.services {
        config.services.file = Some(services.clone());
    }
    if let Some(fallback) = &args.fallback {
        config.constraints.fallback = Some(fallback.clone());
    }
    if let Some(output) = &args.output {
        config.output.dir = output.clone();
    }
}

/// Turn a resolved config into a generation plan, loading input files.
pub fn build_plan(config: &PlannerConfig) -> anyhow::Result<GenerationPlan> {
    let topology = match &config.topology.nodes_file {
        Some(path) => {
            let nodes = load_nodes(path)?;
            if nodes.len() != config.topology.node_count {
                tracing::warn!(
                    configured = config.topology.node_count,
                    loaded = nodes.len(),
                    "node_count is ignored when nodes_file is set"
                );
            }
            TopologySource::Loaded(nodes)
        }
        None => TopologySource::Random {
            node_ids: node_ids(&config.topology.prefix, config.topology.node_count),
            neighborhood_size: config
                .topology
                .effective_neighborhood_size(config.topology.node_count),
            bounds: GeoBounds::default(),
        },
    };

    let services = match &config.services.file {
        Some(path) => {
            if !config.services.names.is_empty() {
                tracing::warn!("services.file is set; ignoring services.names");
            }
            ServiceSource::Loaded(load_services(path)?)
        }
        None => ServiceSource::Random {
            ids: config.services.names.clone(),
        },
    };

    Ok(GenerationPlan {
        topology,
        services,
        metric: config.topology.metric,
        fallback: config.constraints.fallback.clone(),
        constraints: SizeConstraints {
            min_tree_size: config.constraints.min_tree_size,
            at_least_one_tree_size: config.constraints.at_least_one_tree_size,
            max_attempts: config.constraints.max_attempts,
        },
    })
}

fn print_summary(
    instance: &PlacementInstance,
    seed: u64,
    dir: &Path,
    format: &str,
) -> anyhow::Result<()> {
    match format {
        "json" => {
            let trees: Vec<_> = instance
                .trees
                .iter()
                .map(|t| json!({ "service": t.service_id, "path": t.path }))
                .collect();
            let summary = json!({
                "seed": seed,
                "root": instance.root,
                "attempts": instance.attempts,
                "nodes": instance.topology.len(),
                "output": dir.display().to_string(),
                "trees": trees,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            println!("✓ Accepted instance after {} attempt(s) (seed {seed})", instance.attempts);
            println!("  Root:  {}", instance.root);
            println!("  Nodes: {}", instance.topology.len());
            println!();
            for chain in &instance.trees {
                println!("  {}", chain.to_line());
            }
            println!();
            println!("  Output: {}", dir.display());
        }
    }
    Ok(())
}

pub fn generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, "Seeding generator");

    let plan = build_plan(&config)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let instance = generate_instance(&plan, &mut rng)?;
    write_artifacts(&config.output.dir, &instance)?;

    print_summary(&instance, seed, &config.output.dir, &args.format)
}
