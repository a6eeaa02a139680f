use super::metrics::StepTimings;
use super::tiles::Tile;
use super::{SimError, StepOutcome, World};
use crate::action::Action;
use crate::blade::{self, BladePass};
use crate::config::EnvMode;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::time::Instant;
use tracing::debug;

impl World {
    /// Reseed terrain and RNG, return every agent to its spawn pose and
    /// rebuild the tile grid.
    pub fn reset(&mut self, seed: u64) {
        self.tick = 0;
        self.episode_return = 0.0;
        self.last_pass = BladePass::default();
        self.rng = ChaCha12Rng::seed_from_u64(seed);
        self.terrain.initialize(&self.config.terrain);
        for agent in &mut self.agents {
            agent.reset();
        }

        self.tiles.clear();
        if let EnvMode::ClassicReward { goals } = self.config.mode {
            self.build_walls();
            for i in 0..self.agents.len() {
                let (x, y) = self.agent_cell(i);
                self.tiles.set(x, y, Tile::Agent);
            }
            self.place_goals(goals);
        }
        self.compute_observations();
        debug!(seed, tick = self.tick, "world reset");
    }

    /// Advance one tick with exactly one action per agent.
    pub fn step(&mut self, actions: &[Action]) -> Result<StepOutcome, SimError> {
        if actions.len() != self.agents.len() {
            return Err(SimError::ActionCountMismatch {
                expected: self.agents.len(),
                actual: actions.len(),
            });
        }
        let total_start = Instant::now();
        let mut timings = StepTimings::default();
        let mut done = false;
        self.last_pass = BladePass::default();

        let mode = self.config.mode;
        let dt = self.config.timestep;
        let x_bounds = self.config.axis_bounds(self.config.width);
        let y_bounds = self.config.axis_bounds(self.config.height);

        for (idx, &action) in actions.iter().enumerate() {
            let t0 = Instant::now();
            let agent = &mut self.agents[idx];
            agent.reward = 0.0;
            if !agent.apply_action(action) {
                continue;
            }
            let previous = agent.position;
            agent.integrate(dt, x_bounds, y_bounds);
            timings.kinematics_us += t0.elapsed().as_micros() as u64;

            match mode {
                EnvMode::TerrainPhysics => self.step_terrain_phase(idx, &mut timings),
                EnvMode::ClassicReward { .. } => done |= self.step_tile_phase(idx, previous),
            }
        }

        self.tick = self.tick.saturating_add(1);
        if self.tick >= self.config.horizon {
            done = true;
        }
        self.compute_observations();
        if done {
            debug!(
                tick = self.tick,
                episode_return = self.episode_return,
                "episode finished"
            );
        }

        timings.total_us = total_start.elapsed().as_micros() as u64;
        Ok(StepOutcome { done, timings })
    }

    /// Footprint sample, blade pass, then the terrain relaxation pipeline.
    fn step_terrain_phase(&mut self, idx: usize, timings: &mut StepTimings) {
        let t0 = Instant::now();
        let agent = &mut self.agents[idx];
        let sample = self
            .footprint
            .sample(&self.terrain, agent.position, agent.theta);
        agent.avg_height = sample.avg_height;
        let pass = blade::interact(&mut self.terrain, agent);
        self.last_pass.engaged_offsets += pass.engaged_offsets;
        self.last_pass.cut_volume += pass.cut_volume;
        self.last_pass.deposit_volume += pass.deposit_volume;
        timings.interaction_us += t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.terrain.compute_gradients();
        self.terrain.relax();
        timings.terrain_us += t1.elapsed().as_micros() as u64;
    }

    /// Move the agent's tile marker and collect any pickup at its new cell.
    /// Returns `true` when a pickup ends the episode.
    fn step_tile_phase(&mut self, idx: usize, previous: [f64; 2]) -> bool {
        let from = self.terrain.clamp_cell(previous[0], previous[1]);
        let dest = self.agent_cell(idx);
        let Some(mut tile) = self.tiles.get(dest.0, dest.1) else {
            return false;
        };

        let mut picked_up = false;
        if tile.is_pickup() {
            self.tiles.set(dest.0, dest.1, Tile::Empty);
            self.agents[idx].reward = 1.0;
            self.episode_return += 1.0;
            tile = Tile::Empty;
            picked_up = true;
            debug!(agent = idx, x = dest.0, y = dest.1, "pickup collected");
        }
        if tile == Tile::Empty {
            self.tiles.set(from.0, from.1, Tile::Empty);
            self.tiles.set(dest.0, dest.1, Tile::Agent);
        }
        picked_up
    }

    pub(crate) fn agent_cell(&self, idx: usize) -> (usize, usize) {
        let [x, y] = self.agents[idx].position;
        self.terrain.clamp_cell(x, y)
    }

    /// Mark every cell outside the drivable box as wall.
    fn build_walls(&mut self) {
        let xs = self.config.drivable_cells(self.config.width);
        let ys = self.config.drivable_cells(self.config.height);
        for y in 0..self.config.height {
            for x in 0..self.config.width {
                if !xs.contains(&x) || !ys.contains(&y) {
                    self.tiles.set(x, y, Tile::Wall);
                }
            }
        }
    }

    /// Scatter pickups over empty drivable cells: the first is the goal, the
    /// rest are plain rewards. `SimConfig::validate` guarantees room for all.
    fn place_goals(&mut self, goals: usize) {
        let xs = self.config.drivable_cells(self.config.width);
        let ys = self.config.drivable_cells(self.config.height);
        let mut placed = 0;
        while placed < goals {
            let x = self.rng.random_range(xs.clone());
            let y = self.rng.random_range(ys.clone());
            if self.tiles.get(x, y) != Some(Tile::Empty) {
                continue;
            }
            let tile = if placed == 0 { Tile::Goal } else { Tile::Reward };
            self.tiles.set(x, y, tile);
            placed += 1;
        }
    }

    /// Fill each agent's `(2 * vision + 1)^2` window, row-major, clamped at
    /// the grid edge: tile codes in classic mode, heights otherwise.
    pub(crate) fn compute_observations(&mut self) {
        let vision = self.config.vision as i64;
        let side = 2 * vision + 1;
        let window = (side * side) as usize;
        let classic = matches!(self.config.mode, EnvMode::ClassicReward { .. });

        for idx in 0..self.agents.len() {
            let (cx, cy) = self.agent_cell(idx);
            let base = idx * window;
            let mut offset = 0;
            for dy in -vision..=vision {
                for dx in -vision..=vision {
                    let x = cx as f64 + dx as f64;
                    let y = cy as f64 + dy as f64;
                    let (gx, gy) = self.terrain.clamp_cell(x, y);
                    self.observations[base + offset] = if classic {
                        self.tiles
                            .get(gx, gy)
                            .map(|t| t.code() as f32)
                            .unwrap_or(Tile::Wall.code() as f32)
                    } else {
                        self.terrain.sample(x, y)
                    };
                    offset += 1;
                }
            }
        }
    }
}
