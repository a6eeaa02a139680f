use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Which rule set `World::step` runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvMode {
    /// Blade cutting, deposition and erosion relaxation on the height-field.
    TerrainPhysics,
    /// Kinematics only; episodes end when an agent drives onto a goal tile.
    ClassicReward { goals: usize },
}

/// Deterministic elevation formula used to (re)seed the terrain on reset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainProfile {
    Flat {
        level: f32,
    },
    /// `base + amplitude * cos(2π * row / wavelength)`.
    CosineRidge {
        base: f32,
        amplitude: f32,
        wavelength: f32,
    },
    /// Bowl centred in the field, `depth` deep at the centre and `radius` cells wide.
    RadialBowl {
        base: f32,
        depth: f32,
        radius: f32,
    },
    /// `amplitude * sin(column)`.
    SineColumns {
        amplitude: f32,
    },
}

impl TerrainProfile {
    fn is_finite(&self) -> bool {
        match *self {
            TerrainProfile::Flat { level } => level.is_finite(),
            TerrainProfile::CosineRidge {
                base,
                amplitude,
                wavelength,
            } => base.is_finite() && amplitude.is_finite() && wavelength.is_finite(),
            TerrainProfile::RadialBowl {
                base,
                depth,
                radius,
            } => base.is_finite() && depth.is_finite() && radius.is_finite(),
            TerrainProfile::SineColumns { amplitude } => amplitude.is_finite(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    pub num_agents: usize,
    pub horizon: usize,
    pub seed: u64,
    pub mode: EnvMode,
    pub terrain: TerrainProfile,
    pub timestep: f64,
    /// Agents are kept inside `[margin, dimension - margin]` on both axes.
    pub margin: f64,
    pub footprint_length: usize,
    pub footprint_width: usize,
    pub blade_width: usize,
    pub blade_thickness: f32,
    /// Forward distance from the agent to the blade's cutting edge, in cells.
    pub blade_offset: f32,
    pub relax_threshold: f32,
    pub vision: usize,
    /// Spawn coordinates per agent; agents without an entry spawn near the centre.
    pub spawn_points: Vec<[f64; 2]>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            num_agents: 1,
            horizon: 1024,
            seed: 42,
            mode: EnvMode::TerrainPhysics,
            terrain: TerrainProfile::CosineRidge {
                base: 64.0,
                amplitude: 32.0,
                wavelength: 160.0,
            },
            timestep: 0.1,
            margin: Self::DEFAULT_MARGIN,
            footprint_length: 100,
            footprint_width: 50,
            blade_width: 20,
            blade_thickness: 2.0,
            blade_offset: 20.0,
            relax_threshold: 2.0,
            vision: 5,
            spawn_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    NonPositiveDimensions { width: usize, height: usize },
    ZeroAgents,
    ZeroHorizon,
    TooManyAgents { max: usize, actual: usize },
    FieldTooLarge { max: usize, actual: usize },
    InvalidTimestep,
    MarginTooLarge { margin: f64 },
    EmptyFootprint,
    ZeroBladeWidth,
    InvalidRelaxThreshold,
    NonFiniteTerrain,
    TooManySpawnPoints { agents: usize, spawn_points: usize },
    SpawnOutsideBounds { index: usize, x: f64, y: f64 },
    TooManyGoals { goals: usize },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::NonPositiveDimensions { width, height } => {
                write!(f, "field dimensions must be positive (got {width}x{height})")
            }
            SimConfigError::ZeroAgents => write!(f, "num_agents must be at least 1"),
            SimConfigError::ZeroHorizon => write!(f, "horizon must be positive"),
            SimConfigError::TooManyAgents { max, actual } => {
                write!(f, "num_agents ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::FieldTooLarge { max, actual } => {
                write!(f, "field cell count ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::InvalidTimestep => {
                write!(f, "timestep must be finite and positive")
            }
            SimConfigError::MarginTooLarge { margin } => write!(
                f,
                "margin ({margin}) leaves no drivable area inside the field"
            ),
            SimConfigError::EmptyFootprint => {
                write!(f, "footprint_length and footprint_width must be positive")
            }
            SimConfigError::ZeroBladeWidth => write!(f, "blade_width must be positive"),
            SimConfigError::InvalidRelaxThreshold => {
                write!(f, "relax_threshold must be finite and non-negative")
            }
            SimConfigError::NonFiniteTerrain => {
                write!(f, "terrain profile parameters must be finite")
            }
            SimConfigError::TooManySpawnPoints {
                agents,
                spawn_points,
            } => write!(
                f,
                "spawn_points ({spawn_points}) must not exceed num_agents ({agents})"
            ),
            SimConfigError::SpawnOutsideBounds { index, x, y } => write!(
                f,
                "spawn point {index} at ({x}, {y}) lies outside the drivable area"
            ),
            SimConfigError::TooManyGoals { goals } => {
                write!(f, "{goals} goal tiles do not fit inside the drivable area")
            }
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub const MAX_AGENTS: usize = 64;
    pub const MAX_CELLS: usize = 16_777_216;
    pub const DEFAULT_MARGIN: f64 = 50.0;

    /// Default configuration with the given field size, agent count and horizon.
    /// The margin shrinks to `fitted_margin` so any non-empty field is drivable.
    pub fn new(width: usize, height: usize, num_agents: usize, horizon: usize) -> Self {
        Self {
            width,
            height,
            num_agents,
            horizon,
            margin: Self::fitted_margin(width, height),
            ..Self::default()
        }
    }

    /// `DEFAULT_MARGIN`, capped at a quarter of the shorter side.
    pub fn fitted_margin(width: usize, height: usize) -> f64 {
        Self::DEFAULT_MARGIN.min((width.min(height) / 4) as f64)
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(SimConfigError::NonPositiveDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let cells = self
            .width
            .checked_mul(self.height)
            .unwrap_or(usize::MAX);
        if cells > Self::MAX_CELLS {
            return Err(SimConfigError::FieldTooLarge {
                max: Self::MAX_CELLS,
                actual: cells,
            });
        }
        if self.num_agents == 0 {
            return Err(SimConfigError::ZeroAgents);
        }
        if self.num_agents > Self::MAX_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_AGENTS,
                actual: self.num_agents,
            });
        }
        if self.horizon == 0 {
            return Err(SimConfigError::ZeroHorizon);
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(SimConfigError::InvalidTimestep);
        }
        // The drivable box must contain at least one cell centre on each axis.
        if !self.margin.is_finite()
            || self.margin < 0.0
            || 2.0 * self.margin > (self.width.min(self.height) - 1) as f64
        {
            return Err(SimConfigError::MarginTooLarge {
                margin: self.margin,
            });
        }
        if self.footprint_length == 0 || self.footprint_width == 0 {
            return Err(SimConfigError::EmptyFootprint);
        }
        if self.blade_width == 0 {
            return Err(SimConfigError::ZeroBladeWidth);
        }
        if !self.relax_threshold.is_finite() || self.relax_threshold < 0.0 {
            return Err(SimConfigError::InvalidRelaxThreshold);
        }
        if !self.terrain.is_finite()
            || !self.blade_offset.is_finite()
            || !self.blade_thickness.is_finite()
        {
            return Err(SimConfigError::NonFiniteTerrain);
        }
        if self.spawn_points.len() > self.num_agents {
            return Err(SimConfigError::TooManySpawnPoints {
                agents: self.num_agents,
                spawn_points: self.spawn_points.len(),
            });
        }
        for (index, &[x, y]) in self.spawn_points.iter().enumerate() {
            if !self.in_drivable_area(x, y) {
                return Err(SimConfigError::SpawnOutsideBounds { index, x, y });
            }
        }
        if let EnvMode::ClassicReward { goals } = self.mode {
            let room = self.drivable_cells(self.width).count()
                * self.drivable_cells(self.height).count();
            if goals.saturating_add(self.num_agents) > room {
                return Err(SimConfigError::TooManyGoals { goals });
            }
        }
        Ok(())
    }

    /// Inclusive drivable range `[margin, dimension - margin]` along one axis.
    pub fn axis_bounds(&self, dimension: usize) -> (f64, f64) {
        (self.margin, dimension as f64 - self.margin)
    }

    /// Cells an agent inside the drivable range can occupy, matching the
    /// flooring in `TerrainField::clamp_cell`.
    pub fn drivable_cells(&self, dimension: usize) -> std::ops::RangeInclusive<usize> {
        let (lo, hi) = self.axis_bounds(dimension);
        let last = (hi.floor() as usize).min(dimension - 1);
        (lo.floor() as usize)..=last
    }

    pub fn in_drivable_area(&self, x: f64, y: f64) -> bool {
        let (x_lo, x_hi) = self.axis_bounds(self.width);
        let (y_lo, y_hi) = self.axis_bounds(self.height);
        (x_lo..=x_hi).contains(&x) && (y_lo..=y_hi).contains(&y)
    }

    /// Spawn coordinates for agent `index`: configured point, or a column
    /// spread along the field's centre line.
    pub fn spawn_point(&self, index: usize) -> [f64; 2] {
        if let Some(&p) = self.spawn_points.get(index) {
            return p;
        }
        let (x_lo, x_hi) = self.axis_bounds(self.width);
        let cx = self.width as f64 * 0.5;
        let cy = self.height as f64 * 0.5;
        let spacing = self.blade_width as f64 * 2.0;
        let offset = (index as f64 - (self.num_agents as f64 - 1.0) * 0.5) * spacing;
        [(cx + offset).clamp(x_lo, x_hi), cy]
    }
}
