use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "edgeplan",
    about = "edgeplan — canonical placement trees for edge deployment experiments",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a scaffold edgeplan.toml
    Init {
        /// Directory to write into (default: current directory)
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Generate a topology, plan canonical trees, and write run artifacts.
    ///
    /// Settings come from edgeplan.toml (or --config); flags override them.
    Generate(commands::generate::GenerateArgs),
    /// Compare a live run's observed results with the canonical trees
    Analyze {
        /// Observed results JSON: deployment -> node -> children
        #[arg(short, long)]
        results: PathBuf,
        /// Canonical tree artifact
        #[arg(short, long, default_value = "build/metrics/services.tree")]
        tree: PathBuf,
        /// Root artifact; its first line names the root node
        #[arg(long, default_value = "build/metrics/fallback.txt")]
        fallback: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a scenario file with node locations and an optional latency matrix
    Scenario(commands::scenario::ScenarioArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("edgeplan=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => commands::init::init(&path),
        Commands::Generate(args) => commands::generate::generate(&args),
        Commands::Analyze {
            results,
            tree,
            fallback,
            format,
        } => commands::analyze::analyze(&results, &tree, &fallback, &format),
        Commands::Scenario(args) => commands::scenario::scenario(&args),
    }
}
