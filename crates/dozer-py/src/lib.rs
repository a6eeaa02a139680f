use dozer_core::{SimConfig, World};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Python handle over one `World`. Calls are serialized by the GIL.
#[pyclass(name = "Simulation")]
struct Simulation {
    world: World,
}

#[pymethods]
impl Simulation {
    /// Without `config_json` the margin is fitted to the field size. A JSON
    /// config supplies every other field; the positional arguments always win
    /// for dimensions, agent count and horizon.
    #[new]
    #[pyo3(signature = (width, height, num_agents=1, horizon=1024, config_json=None))]
    fn new(
        width: usize,
        height: usize,
        num_agents: usize,
        horizon: usize,
        config_json: Option<&str>,
    ) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => SimConfig {
                width,
                height,
                num_agents,
                horizon,
                ..serde_json::from_str::<SimConfig>(json).map_err(value_error)?
            },
            None => SimConfig::new(width, height, num_agents, horizon),
        };
        let world = World::try_new(config).map_err(value_error)?;
        Ok(Self { world })
    }

    fn reset(&mut self, seed: u64) {
        self.world.reset(seed);
    }

    /// One action code per agent. Returns `done`.
    fn step(&mut self, actions: Vec<u32>) -> PyResult<bool> {
        let outcome = self.world.step_codes(&actions).map_err(value_error)?;
        Ok(outcome.done)
    }

    fn get_height(&self, x: i64, y: i64) -> PyResult<f32> {
        self.world.get_height(x, y).map_err(value_error)
    }

    /// `(x, y, theta, vel, blade_pos, blade_yaw)`.
    fn agent_pose(&self, index: usize) -> PyResult<(f64, f64, f64, f64, f32, f64)> {
        let p = self.world.agent_pose(index).map_err(value_error)?;
        Ok((p.x, p.y, p.theta, p.vel, p.blade_pos, p.blade_yaw))
    }

    fn heights(&self) -> Vec<f32> {
        self.world.terrain().heights().to_vec()
    }

    fn observations(&self) -> Vec<f32> {
        self.world.observations().to_vec()
    }

    fn rewards(&self) -> Vec<f32> {
        self.world.rewards()
    }

    /// Metrics for the last tick as a JSON string.
    fn metrics_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.world.collect_step_metrics()).map_err(value_error)
    }

    #[getter]
    fn tick(&self) -> usize {
        self.world.tick()
    }

    #[getter]
    fn width(&self) -> usize {
        self.world.config().width
    }

    #[getter(height)]
    fn config_height(&self) -> usize {
        self.world.config().height
    }
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_class::<Simulation>()?;
    Ok(())
}
