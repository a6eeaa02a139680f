pub mod lifecycle;
pub mod metrics;
pub mod tiles;

pub use metrics::*;
pub use tiles::{Tile, TileGrid};

use crate::action::Action;
use crate::agent::{Agent, AgentPose, BladeGeometry};
use crate::blade::BladePass;
use crate::config::{SimConfig, SimConfigError};
use crate::footprint::Footprint;
use crate::terrain::TerrainField;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) terrain: TerrainField,
    pub(crate) agents: Vec<Agent>,
    pub(crate) footprint: Footprint,
    pub(crate) tiles: TileGrid,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) tick: usize,
    pub(crate) episode_return: f32,
    pub(crate) observations: Vec<f32>,
    /// Blade totals accumulated over every agent during the last step.
    pub(crate) last_pass: BladePass,
}

/// Outcome of one `World::step`.
#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub done: bool,
    pub timings: StepTimings,
}

/// Recoverable errors raised at the simulation boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    InvalidAction { code: u32 },
    OutOfBounds { x: i64, y: i64 },
    ActionCountMismatch { expected: usize, actual: usize },
    AgentIndex { index: usize, count: usize },
    GridShape { width: usize, height: usize, len: usize },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidAction { code } => write!(f, "invalid action code: {code}"),
            SimError::OutOfBounds { x, y } => {
                write!(f, "cell ({x}, {y}) lies outside the terrain grid")
            }
            SimError::ActionCountMismatch { expected, actual } => write!(
                f,
                "expected one action per agent ({expected}), got {actual}"
            ),
            SimError::AgentIndex { index, count } => {
                write!(f, "agent index {index} out of range for {count} agents")
            }
            SimError::GridShape { width, height, len } => write!(
                f,
                "{len} height values do not fill a {width}x{height} grid"
            ),
        }
    }
}

impl Error for SimError {}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    Step(SimError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::Step(e) => write!(f, "step failed: {e}"),
        }
    }
}

impl From<SimError> for ExperimentError {
    fn from(err: SimError) -> Self {
        ExperimentError::Step(err)
    }
}

impl Error for ExperimentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExperimentError::Step(e) => Some(e),
            _ => None,
        }
    }
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;

    /// Build a world from a validated config and reset it with `config.seed`.
    /// Nothing is allocated when validation fails.
    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;

        let blade = BladeGeometry {
            width: config.blade_width,
            thickness: config.blade_thickness,
            offset: config.blade_offset,
        };
        let agents = (0..config.num_agents)
            .map(|i| Agent::new(i as u32, config.spawn_point(i), blade))
            .collect();
        let terrain = TerrainField::new(config.width, config.height)
            .with_relax_threshold(config.relax_threshold);
        let obs_len = config.num_agents * Self::window_len(config.vision);

        let mut world = Self {
            terrain,
            agents,
            footprint: Footprint::new(config.footprint_length, config.footprint_width),
            tiles: TileGrid::new(config.width, config.height),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            tick: 0,
            episode_return: 0.0,
            observations: vec![0.0; obs_len],
            last_pass: BladePass::default(),
            config,
        };
        let seed = world.config.seed;
        world.reset(seed);
        Ok(world)
    }

    fn window_len(vision: usize) -> usize {
        let side = 2 * vision + 1;
        side * side
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn terrain(&self) -> &TerrainField {
        &self.terrain
    }

    pub fn terrain_mut(&mut self) -> &mut TerrainField {
        &mut self.terrain
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn episode_return(&self) -> f32 {
        self.episode_return
    }

    pub fn is_done(&self) -> bool {
        self.tick >= self.config.horizon
    }

    pub fn get_height(&self, x: i64, y: i64) -> Result<f32, SimError> {
        self.terrain.get_height(x, y)
    }

    pub fn agent_pose(&self, index: usize) -> Result<AgentPose, SimError> {
        self.agents
            .get(index)
            .map(Agent::pose)
            .ok_or(SimError::AgentIndex {
                index,
                count: self.agents.len(),
            })
    }

    pub fn rewards(&self) -> Vec<f32> {
        self.agents.iter().map(|a| a.reward).collect()
    }

    /// Flat observation buffer, `observation_size()` values per agent.
    pub fn observations(&self) -> &[f32] {
        &self.observations
    }

    pub fn observation_size(&self) -> usize {
        Self::window_len(self.config.vision)
    }

    /// Decode raw action codes, then step. An invalid code leaves the world untouched.
    pub fn step_codes(&mut self, codes: &[u32]) -> Result<StepOutcome, SimError> {
        let actions = codes
            .iter()
            .map(|&code| Action::try_from(code))
            .collect::<Result<Vec<_>, _>>()?;
        self.step(&actions)
    }
}
