use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use monitor_select::clustering::ClusteringMethod;
use monitor_select::config::SelectionConfig;
use monitor_select::driver::{self, RunRequest};
use monitor_select::observability;
use monitor_select::selection::SelectionParams;

/// Order vantage points from a similarity matrix.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Similarity matrix JSON file ({"items": [...], "values": [[...]]})
    #[arg(long, env = "MONITOR_SELECT_SIMILARITY")]
    similarity: PathBuf,

    /// greedy-max-elimination, greedy-min-diverse or cluster-sample
    #[arg(long, env = "MONITOR_SELECT_METHOD", default_value = "greedy-min-diverse")]
    method: String,

    /// Number of items to select (all when omitted)
    #[arg(long)]
    nb_items: Option<usize>,

    /// Clustering backend for cluster-sample: kmeans or spectral
    #[arg(long)]
    clustering: Option<ClusteringMethod>,

    /// Number of clusters for cluster-sample
    #[arg(long)]
    nb_clusters: Option<usize>,

    /// Rank-normalize rows during greedy elimination
    #[arg(long)]
    rank_normalize: bool,

    /// Seed for reproducible runs (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Observer-to-item distance table JSON for proximity scoring
    #[arg(long)]
    distances: Option<PathBuf>,

    /// Repeat the selection and report every run (needs --distances)
    #[arg(long)]
    runs: Option<usize>,

    /// TOML configuration file; MONITOR_SELECT_* variables apply when omitted
    #[arg(long, env = "MONITOR_SELECT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    observability::init()?;
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SelectionConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SelectionConfig::from_env().context("failed to load config from environment")?,
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let request = RunRequest {
        similarity: args.similarity,
        method: args.method,
        params: SelectionParams {
            nb_items: args.nb_items,
            clustering: args.clustering,
            nb_clusters: args.nb_clusters,
            rank_normalize: args.rank_normalize,
        },
        distances: args.distances,
        runs: args.runs,
    };

    let output = driver::run(&request, &config)?;
    driver::write_output(&output, args.output.as_deref())
}
