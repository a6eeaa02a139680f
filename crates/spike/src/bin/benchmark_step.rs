use dozer_core::{Action, SimConfig, TerrainProfile, World};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::time::Instant;

fn random_actions(rng: &mut ChaCha12Rng, steps: usize, agents: usize) -> Vec<Vec<Action>> {
    (0..steps)
        .map(|_| {
            (0..agents)
                .map(|_| Action::ALL[rng.random_range(2..Action::ALL.len())])
                .collect()
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let num_agents = 8;
    let steps = 200;
    let config = SimConfig {
        width: 800,
        height: 800,
        num_agents,
        horizon: steps + 1,
        terrain: TerrainProfile::CosineRidge {
            base: 64.0,
            amplitude: 32.0,
            wavelength: 160.0,
        },
        seed: 42,
        ..SimConfig::default()
    };
    println!(
        "Benchmarking {}x{} field with {} agents over {} steps",
        config.width, config.height, num_agents, steps
    );

    let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
    let script = random_actions(&mut rng, steps, num_agents);
    let mut world1 = World::try_new(config.clone())?;
    let mut world2 = World::try_new(config)?;

    let start = Instant::now();
    let mut terrain_us = 0;
    for actions in &script {
        terrain_us += world1.step(actions)?.timings.terrain_us;
    }
    let duration_no_metrics = start.elapsed();
    println!("Time for {} steps WITHOUT metrics: {:?}", steps, duration_no_metrics);
    println!("Avg time per step (no metrics): {:?}", duration_no_metrics / steps as u32);
    println!("Avg terrain pass per step: {}us", terrain_us / steps as u64);

    let start = Instant::now();
    let summary = world2.run_episode(|tick, _| script[tick].clone(), steps, 1)?;
    let duration_metrics = start.elapsed();
    println!("Time for {} steps WITH metrics: {:?}", steps, duration_metrics);
    println!("Avg time per step (with metrics): {:?}", duration_metrics / steps as u32);
    println!(
        "Volume drift: {:.3}",
        summary.final_volume - summary.initial_volume
    );

    let diff = duration_metrics.saturating_sub(duration_no_metrics);
    println!("Total metrics overhead: {:?}", diff);
    println!("Avg metrics overhead per step: {:?}", diff / steps as u32);
    Ok(())
}
