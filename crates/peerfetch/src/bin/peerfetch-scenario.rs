//! Run the proxy scenario and print its report as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use peerfetch::ScenarioConfig;

#[derive(Parser, Debug)]
#[command(name = "peerfetch-scenario", version, about)]
struct Args {
    /// JSON scenario file; defaults apply to anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Override the stop time, in seconds of virtual time.
    #[arg(long)]
    stop_secs: Option<u64>,
    /// Override the number of valid peers.
    #[arg(long)]
    valid_peers: Option<usize>,
    /// Override the number of invalid peers.
    #[arg(long)]
    invalid_peers: Option<usize>,
    /// Log protocol events to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("failed to load scenario from {}", path.display()))?,
        None => ScenarioConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.sim.seed = seed;
    }
    if let Some(secs) = args.stop_secs {
        config.sim.stop_time = std::time::Duration::from_secs(secs);
    }
    if let Some(n) = args.valid_peers {
        config.scenario.valid_peers = n;
    }
    if let Some(n) = args.invalid_peers {
        config.scenario.invalid_peers = n;
    }

    let report = config.run().context("scenario failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.all_settled() {
        anyhow::bail!("some peers did not settle before the stop time");
    }
    Ok(())
}
