//! Blade cut/deposit rule.
//!
//! For every lateral offset across the blade, two cut cells sit at the
//! cutting edge and one cell beyond it, and three deposit cells follow two to
//! four cells further along the direction of travel. When the reference height
//! (`avg_height + blade_pos`) is at or below either cut cell, both cut cells
//! are levelled to the reference and each deposit cell receives a third of the
//! removed volume. Overlapping deposit windows between neighbouring offsets
//! mean the field's total volume is not preserved exactly.

use crate::agent::{rotate, Agent};
use crate::terrain::TerrainField;
use tracing::trace;

/// Forward steps past the cutting edge, in cells.
const CUT_STEPS: [f32; 2] = [0.0, 1.0];
const DEPOSIT_STEPS: [f32; 3] = [2.0, 3.0, 4.0];

/// Per-call totals, used for step metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BladePass {
    pub engaged_offsets: usize,
    pub cut_volume: f64,
    pub deposit_volume: f64,
}

/// Lateral offsets for a blade `width` cells wide, centre outward:
/// `-1, 0, -2, 1, -3, 2, ...`.
pub fn interleaved_offsets(width: usize) -> impl Iterator<Item = i64> {
    (0..width as i64).map(|k| if k % 2 == 0 { -(k / 2) - 1 } else { (k - 1) / 2 })
}

/// Volume share per deposit-cell third, or `None` when the blade rides above
/// both cut heights.
pub fn engagement(h1: f32, h2: f32, reference: f32) -> Option<f32> {
    if reference <= h1 || reference <= h2 {
        Some(((h1 - reference) + (h2 - reference)) / 6.0)
    } else {
        None
    }
}

/// Run the blade over the terrain for one tick. The agent's `avg_height`
/// must already hold this tick's footprint sample.
pub fn interact(field: &mut TerrainField, agent: &Agent) -> BladePass {
    let dir = agent.direction();
    let angle = agent.theta + dir * agent.blade_yaw;
    let reference = agent.avg_height + agent.blade_pos;
    let mut pass = BladePass::default();

    for lateral in interleaved_offsets(agent.blade.width) {
        let cell_at = |step: f32| {
            let forward = dir * (agent.blade.offset + step) as f64;
            let p = rotate([lateral as f64, forward], angle);
            field.clamp_cell(agent.position[0] + p[0], agent.position[1] + p[1])
        };
        let cuts = CUT_STEPS.map(cell_at);
        let deposits = DEPOSIT_STEPS.map(cell_at);

        let h1 = field.cell(cuts[0]);
        let h2 = field.cell(cuts[1]);
        let Some(delta) = engagement(h1, h2, reference) else {
            continue;
        };
        trace!(
            lateral,
            h1,
            h2,
            reference,
            avg_height = agent.avg_height,
            delta,
            "blade engaged"
        );

        for cell in deposits {
            *field.cell_mut(cell) += 2.0 * delta;
        }
        for cell in cuts {
            *field.cell_mut(cell) = reference;
        }
        pass.engaged_offsets += 1;
        pass.cut_volume += (6.0 * delta) as f64;
        pass.deposit_volume += (6.0 * delta) as f64;
    }
    pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::BladeGeometry;
    use crate::config::TerrainProfile;

    fn agent_at(position: [f64; 2], width: usize) -> Agent {
        Agent::new(
            0,
            position,
            BladeGeometry {
                width,
                thickness: 2.0,
                offset: 3.0,
            },
        )
    }

    #[test]
    fn offsets_interleave_from_centre() {
        let offsets: Vec<i64> = interleaved_offsets(7).collect();
        assert_eq!(offsets, vec![-1, 0, -2, 1, -3, 2, -4]);
        assert_eq!(interleaved_offsets(20).min(), Some(-10));
        assert_eq!(interleaved_offsets(20).max(), Some(9));
    }

    #[test]
    fn deposits_receive_six_delta_in_total() {
        let (h1, h2, hb) = (14.0f32, 11.0f32, 10.0f32);
        let delta = engagement(h1, h2, hb).expect("engaged");
        assert_eq!(delta, ((h1 - hb) + (h2 - hb)) / 6.0);
        assert_eq!(3.0 * (2.0 * delta), 6.0 * delta);
        assert_eq!(engagement(9.0, 9.5, 10.0), None);
        // One cut point above the reference engages the blade.
        assert!(engagement(10.0, 4.0, 10.0).is_some());
    }

    #[test]
    fn single_offset_cut_moves_soil_forward() {
        let mut field = TerrainField::new(20, 20);
        field.initialize(&TerrainProfile::Flat { level: 0.0 });
        let mut agent = agent_at([10.5, 5.5], 1);
        // Offset -1 at heading 0: cut cells (9, 8) and (9, 9).
        field.set_height(9, 8, 6.0).expect("in range");
        field.set_height(9, 9, 3.0).expect("in range");
        agent.avg_height = 0.0;
        agent.blade_pos = 1.0;

        let pass = interact(&mut field, &agent);
        assert_eq!(pass.engaged_offsets, 1);
        let delta = ((6.0 - 1.0) + (3.0 - 1.0)) / 6.0f32;
        assert_eq!(field.get_height(9, 8), Ok(1.0));
        assert_eq!(field.get_height(9, 9), Ok(1.0));
        for y in 10..=12 {
            assert_eq!(field.get_height(9, y), Ok(2.0 * delta));
        }
        assert!((pass.deposit_volume - 7.0).abs() < 1e-5);
    }

    #[test]
    fn reversing_cuts_behind_the_vehicle() {
        let mut field = TerrainField::new(20, 20);
        field.initialize(&TerrainProfile::Flat { level: 0.0 });
        let mut agent = agent_at([10.5, 14.5], 1);
        agent.vel = -2.0;
        field.set_height(9, 11, 4.0).expect("in range");
        agent.blade_pos = 0.0;
        interact(&mut field, &agent);
        assert_eq!(field.get_height(9, 11), Ok(0.0));
        assert!(field.get_height(9, 8).unwrap() > 0.0);
    }

    fn changed_cells(field: &TerrainField) -> Vec<(usize, usize)> {
        let w = field.width();
        field
            .heights()
            .iter()
            .enumerate()
            .filter(|(_, &h)| h != 0.0)
            .map(|(i, _)| (i % w, i / w))
            .collect()
    }

    fn yawed_agent(position: [f64; 2], vel: f64) -> Agent {
        let mut agent = Agent::new(
            0,
            position,
            BladeGeometry {
                width: 1,
                thickness: 2.0,
                offset: 10.0,
            },
        );
        agent.vel = vel;
        agent.blade_yaw = 0.5;
        agent.blade_pos = -1.0;
        agent
    }

    #[test]
    fn blade_yaw_swings_cut_and_deposit_cells() {
        let mut field = TerrainField::new(40, 40);
        field.initialize(&TerrainProfile::Flat { level: 0.0 });
        let agent = yawed_agent([20.5, 10.5], 0.0);
        let pass = interact(&mut field, &agent);
        assert_eq!(pass.engaged_offsets, 1);
        let mut cells = changed_cells(&field);
        cells.sort_by_key(|&(x, y)| (y, x));
        assert_eq!(cells, vec![(24, 19), (24, 20), (25, 21), (25, 22), (26, 23)]);
        assert_eq!(field.get_height(24, 19), Ok(-1.0));
        assert_eq!(field.get_height(24, 20), Ok(-1.0));
        assert_eq!(field.get_height(25, 21), Ok(2.0 / 3.0));
    }

    #[test]
    fn reversing_flips_blade_yaw() {
        let mut field = TerrainField::new(40, 40);
        field.initialize(&TerrainProfile::Flat { level: 0.0 });
        let agent = yawed_agent([20.5, 30.5], -1.0);
        let pass = interact(&mut field, &agent);
        assert_eq!(pass.engaged_offsets, 1);
        let mut cells = changed_cells(&field);
        cells.sort_by_key(|&(x, y)| (std::cmp::Reverse(y), x));
        // Mirrored through the agent's row: the blade still swings towards +x.
        assert_eq!(cells, vec![(24, 21), (24, 20), (25, 19), (25, 18), (26, 17)]);
        assert_eq!(field.get_height(24, 21), Ok(-1.0));
        assert_eq!(field.get_height(26, 17), Ok(2.0 / 3.0));
    }

    #[test]
    fn raised_blade_leaves_terrain_alone() {
        let mut field = TerrainField::new(30, 30);
        field.initialize(&TerrainProfile::Flat { level: 5.0 });
        let mut agent = agent_at([15.0, 10.0], 8);
        agent.avg_height = 5.0;
        agent.blade_pos = 3.0;
        let before = field.heights().to_vec();
        let pass = interact(&mut field, &agent);
        assert_eq!(pass, BladePass::default());
        assert_eq!(field.heights(), &before[..]);
    }

    #[test]
    fn samples_near_edge_are_clamped() {
        let mut field = TerrainField::new(10, 10);
        field.initialize(&TerrainProfile::Flat { level: 2.0 });
        let mut agent = agent_at([9.5, 9.5], 12);
        agent.theta = 0.3;
        agent.avg_height = 2.0;
        agent.blade_pos = -1.0;
        let pass = interact(&mut field, &agent);
        assert_eq!(pass.engaged_offsets, 12);
        assert!(field.heights().iter().all(|h| h.is_finite()));
    }
}
