use std::path::PathBuf;
use std::process::ExitCode;

use cab_core::config::{CabConfig, ShardSelectionKind};
use cab_core::logging::init_logging;
use cab_sim::runner::run_scenario;
use cab_sim::scenario::ScenarioParams;
use clap::{Parser, ValueEnum};
use tracing::error;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "cab_sim",
    about = "Run a fleet of cab tasks against demo dispatcher shards and print a JSON summary"
)]
struct Cli {
    /// JSON scenario file; flags below override its values
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// JSON cab config file; replaces the scenario's `cab` section
    #[arg(long)]
    cab_config: Option<PathBuf>,
    #[arg(long)]
    cabs: Option<usize>,
    #[arg(long)]
    shards: Option<usize>,
    #[arg(long)]
    rides: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Probability that a matched ride is canceled
    #[arg(long)]
    cancel_probability: Option<f64>,
    /// Strategy for picking the shard notified on sign-in/sign-out
    #[arg(long, value_enum)]
    shard_selection: Option<SelectionArg>,
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, env = "CAB_SIM_LOG", default_value = "info")]
    log_level: LevelFilter,
    /// Include per-cab snapshots in the output
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SelectionArg {
    Random,
    RoundRobin,
    Hash,
}

impl Cli {
    fn scenario_params(&self) -> Result<ScenarioParams, cab_core::error::ConfigError> {
        let mut params = match &self.scenario {
            Some(path) => ScenarioParams::load(path)?,
            None => ScenarioParams::default(),
        };
        if let Some(path) = &self.cab_config {
            params = params.with_cab_config(CabConfig::load(path)?);
        }
        if let Some(cabs) = self.cabs {
            params = params.with_cabs(cabs);
        }
        if let Some(shards) = self.shards {
            params = params.with_shards(shards);
        }
        if let Some(rides) = self.rides {
            params = params.with_rides(rides);
        }
        if let Some(seed) = self.seed {
            params = params.with_seed(seed);
        }
        if let Some(probability) = self.cancel_probability {
            params = params.with_cancel_probability(probability);
        }
        if let Some(selection) = self.shard_selection {
            let kind = match selection {
                SelectionArg::Random => ShardSelectionKind::Random {
                    seed: Some(params.seed),
                },
                SelectionArg::RoundRobin => ShardSelectionKind::RoundRobin,
                SelectionArg::Hash => ShardSelectionKind::Hash,
            };
            params = params.with_shard_selection(kind);
        }
        Ok(params)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let params = match cli.scenario_params() {
        Ok(params) => params,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut summary = match run_scenario(&params).await {
        Ok(summary) => summary,
        Err(err) => {
            error!("scenario failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    if !cli.verbose {
        summary.cabs.clear();
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("failed to serialize summary: {err}");
            ExitCode::FAILURE
        }
    }
}
