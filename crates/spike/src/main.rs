//! Headless dozer runner.
//!
//! Drives one episode with a scripted or random policy and prints the run
//! summary as JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dozer_core::world::RunSummary;
use dozer_core::{Action, EnvMode, SimConfig, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Each scripted action is held for this many ticks before moving on.
const SCRIPT_HOLD: usize = 6;

const SCRIPT: [Action; 6] = [
    Action::SpeedUp,
    Action::SpeedDown,
    Action::Left,
    Action::Right,
    Action::BladeUp,
    Action::BladeDown,
];

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Terrain,
    Classic,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// Cycle through the scripted actuator sequence
    Scripted,
    /// Uniform random action codes
    Random,
}

#[derive(Parser)]
#[command(name = "dozer")]
#[command(about = "Run a bulldozer terrain episode and print a JSON summary")]
struct Cli {
    /// JSON config file; flags below override its fields when given
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    /// Number of agents
    #[arg(long)]
    agents: Option<usize>,

    #[arg(long)]
    horizon: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    margin: Option<f64>,

    /// Environment mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Pickups placed in classic mode
    #[arg(long, default_value = "1")]
    goals: usize,

    #[arg(long, value_enum, default_value = "scripted")]
    policy: Policy,

    /// Maximum ticks to run
    #[arg(long, default_value = "1024")]
    steps: usize,

    /// Sample metrics every N ticks
    #[arg(long, default_value = "64")]
    sample_every: usize,

    /// Write the summary here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn build_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str::<SimConfig>(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => {
                let defaults = SimConfig::default();
                SimConfig::new(
                    self.width.unwrap_or(defaults.width),
                    self.height.unwrap_or(defaults.height),
                    self.agents.unwrap_or(defaults.num_agents),
                    self.horizon.unwrap_or(defaults.horizon),
                )
            }
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(agents) = self.agents {
            config.num_agents = agents;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(margin) = self.margin {
            config.margin = margin;
        }
        match self.mode {
            Some(Mode::Terrain) => config.mode = EnvMode::TerrainPhysics,
            Some(Mode::Classic) => config.mode = EnvMode::ClassicReward { goals: self.goals },
            None => {}
        }
        Ok(config)
    }
}

fn scripted_action(tick: usize) -> Action {
    SCRIPT[(tick / SCRIPT_HOLD) % SCRIPT.len()]
}

fn run(cli: &Cli, config: SimConfig) -> Result<RunSummary> {
    let num_agents = config.num_agents;
    let mut rng = ChaCha12Rng::seed_from_u64(config.seed.wrapping_add(1));
    let mut world = World::try_new(config).context("building world")?;
    let policy = cli.policy;

    let summary = world.run_episode(
        |tick, _| match policy {
            Policy::Scripted => vec![scripted_action(tick); num_agents],
            Policy::Random => (0..num_agents)
                .map(|_| Action::ALL[rng.random_range(0..Action::ALL.len())])
                .collect(),
        },
        cli.steps,
        cli.sample_every,
    )?;
    Ok(summary)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.build_config()?;
    info!(
        width = config.width,
        height = config.height,
        agents = config.num_agents,
        seed = config.seed,
        policy = ?cli.policy,
        "starting run"
    );

    let summary = run(&cli, config)?;
    info!(
        steps = summary.steps,
        done = summary.done,
        episode_return = summary.episode_return,
        "run finished"
    );

    let json = serde_json::to_string_pretty(&summary)?;
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing summary {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
