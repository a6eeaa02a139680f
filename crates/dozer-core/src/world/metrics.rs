use super::{ExperimentError, World};
use crate::action::Action;
use crate::agent::AgentPose;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default)]
pub struct StepTimings {
    pub kinematics_us: u64,
    pub interaction_us: u64,
    pub terrain_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub tick: usize,
    pub max_height: f32,
    pub mean_height: f32,
    pub total_volume: f64,
    /// Soil removed by the blade during this tick, summed over agents.
    pub cut_volume: f64,
    pub deposit_volume: f64,
    pub engaged_offsets: usize,
    pub episode_return: f32,
    pub lead_pose: Option<AgentPose>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub done: bool,
    pub episode_return: f32,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub initial_volume: f64,
    #[serde(default)]
    pub final_volume: f64,
}

impl World {
    pub fn collect_step_metrics(&self) -> StepMetrics {
        StepMetrics {
            tick: self.tick,
            max_height: self.terrain.max_height(),
            mean_height: self.terrain.mean_height(),
            total_volume: self.terrain.total_volume(),
            cut_volume: self.last_pass.cut_volume,
            deposit_volume: self.last_pass.deposit_volume,
            engaged_offsets: self.last_pass.engaged_offsets,
            episode_return: self.episode_return,
            lead_pose: self.agents.first().map(|a| a.pose()),
        }
    }

    /// Drive the world with `policy` until the episode ends or `max_steps`
    /// ticks have run, sampling metrics every `sample_every` ticks and on the
    /// final tick. The policy receives the current tick and the world.
    pub fn run_episode<P>(
        &mut self,
        mut policy: P,
        max_steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError>
    where
        P: FnMut(usize, &World) -> Vec<Action>,
    {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if max_steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: max_steps,
            });
        }

        let initial_volume = self.terrain.total_volume();
        let mut samples = Vec::with_capacity(max_steps / sample_every + 1);
        let mut steps = 0;
        let mut done = false;
        while steps < max_steps && !done {
            let actions = policy(self.tick, self);
            done = self.step(&actions)?.done;
            steps += 1;
            if steps % sample_every == 0 || steps == max_steps || done {
                samples.push(self.collect_step_metrics());
            }
        }

        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            done,
            episode_return: self.episode_return,
            samples,
            initial_volume,
            final_volume: self.terrain.total_volume(),
        })
    }
}
