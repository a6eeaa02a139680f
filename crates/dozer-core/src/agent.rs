use crate::action::Action;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub const MAX_SPEED: f64 = 10.0;
pub const MAX_TURN_RATE: f64 = 1.0;
pub const TURN_RATE_STEP: f64 = 0.1;
pub const BLADE_POS_MIN: f32 = -10.0;
pub const BLADE_POS_MAX: f32 = 15.0;
pub const MAX_BLADE_YAW: f64 = 0.5;
pub const BLADE_YAW_STEP: f64 = 0.01;

/// Rotate a vehicle-local `(lateral, forward)` offset into world axes.
///
/// `rotate([0, 1], theta)` is `[sin theta, cos theta]`, the direction the
/// vehicle drives at heading `theta`.
#[inline]
pub fn rotate(p: [f64; 2], theta: f64) -> [f64; 2] {
    let (s, c) = theta.sin_cos();
    [p[0] * c + p[1] * s, -p[0] * s + p[1] * c]
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BladeGeometry {
    /// Lateral extent in cells.
    pub width: usize,
    pub thickness: f32,
    /// Forward distance from the vehicle origin to the cutting edge.
    pub offset: f32,
}

/// Read-only view of an agent consumed by renderers and bindings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub vel: f64,
    pub blade_pos: f32,
    pub blade_yaw: f64,
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: u32,
    /// World position `[x, y]` in cell units.
    pub position: [f64; 2],
    /// Heading in `[0, 2π)`.
    pub theta: f64,
    pub theta_dot: f64,
    pub vel: f64,
    pub blade_pos: f32,
    pub blade_yaw: f64,
    pub blade: BladeGeometry,
    /// Mean terrain height under the footprint at the last sample.
    pub avg_height: f32,
    pub reward: f32,
    spawn: [f64; 2],
    spawn_blade: BladeGeometry,
}

impl Agent {
    pub fn new(id: u32, spawn: [f64; 2], blade: BladeGeometry) -> Self {
        Self {
            id,
            position: spawn,
            theta: 0.0,
            theta_dot: 0.0,
            vel: 0.0,
            blade_pos: 0.0,
            blade_yaw: 0.0,
            blade,
            avg_height: 0.0,
            reward: 0.0,
            spawn,
            spawn_blade: blade,
        }
    }

    pub fn spawn(&self) -> [f64; 2] {
        self.spawn
    }

    /// Return to the spawn pose with all actuators zeroed.
    pub fn reset(&mut self) {
        self.position = self.spawn;
        self.theta = 0.0;
        self.theta_dot = 0.0;
        self.vel = 0.0;
        self.blade_pos = 0.0;
        self.blade_yaw = 0.0;
        self.blade = self.spawn_blade;
        self.avg_height = 0.0;
        self.reward = 0.0;
    }

    pub fn pose(&self) -> AgentPose {
        AgentPose {
            x: self.position[0],
            y: self.position[1],
            theta: self.theta,
            vel: self.vel,
            blade_pos: self.blade_pos,
            blade_yaw: self.blade_yaw,
        }
    }

    /// Travel direction: `+1` forward or stopped, `-1` reversing.
    pub fn direction(&self) -> f64 {
        if self.vel < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// Apply one action's actuator change. Returns `false` for `Pass`, which
    /// suppresses the rest of this agent's update for the tick.
    pub fn apply_action(&mut self, action: Action) -> bool {
        match action {
            Action::Pass => return false,
            Action::Continue => {}
            Action::SpeedUp => self.vel = (self.vel + 1.0).min(MAX_SPEED),
            Action::SpeedDown => self.vel = (self.vel - 1.0).max(-MAX_SPEED),
            Action::Left => {
                self.theta_dot = (self.theta_dot + TURN_RATE_STEP).min(MAX_TURN_RATE)
            }
            Action::Right => {
                self.theta_dot = (self.theta_dot - TURN_RATE_STEP).max(-MAX_TURN_RATE)
            }
            Action::YawLeft => {
                self.blade_yaw = (self.blade_yaw + BLADE_YAW_STEP).min(MAX_BLADE_YAW)
            }
            Action::YawRight => {
                self.blade_yaw = (self.blade_yaw - BLADE_YAW_STEP).max(-MAX_BLADE_YAW)
            }
            Action::BladeUp => self.blade_pos = (self.blade_pos + 1.0).min(BLADE_POS_MAX),
            Action::BladeDown => self.blade_pos = (self.blade_pos - 1.0).max(BLADE_POS_MIN),
        }
        true
    }

    /// Unicycle integration of heading then position. Each axis of the
    /// destination is clamped into its `(lo, hi)` bound.
    pub fn integrate(&mut self, dt: f64, x_bounds: (f64, f64), y_bounds: (f64, f64)) {
        self.theta = (self.theta + self.theta_dot * dt).rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs.
        if self.theta >= TAU {
            self.theta = 0.0;
        }

        let step = rotate([0.0, dt * self.vel], self.theta);
        self.position[0] = (self.position[0] + step[0]).clamp(x_bounds.0, x_bounds.1);
        self.position[1] = (self.position[1] + step[1]).clamp(y_bounds.0, y_bounds.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn blade() -> BladeGeometry {
        BladeGeometry {
            width: 20,
            thickness: 2.0,
            offset: 20.0,
        }
    }

    const OPEN: (f64, f64) = (f64::MIN, f64::MAX);

    #[test]
    fn rotate_matches_drive_direction() {
        let f = rotate([0.0, 1.0], 0.0);
        assert!((f[0]).abs() < 1e-12 && (f[1] - 1.0).abs() < 1e-12);
        let f = rotate([0.0, 1.0], FRAC_PI_2);
        assert!((f[0] - 1.0).abs() < 1e-12 && f[1].abs() < 1e-12);
        let l = rotate([1.0, 0.0], FRAC_PI_2);
        assert!(l[0].abs() < 1e-12 && (l[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pass_reports_skip_and_changes_nothing() {
        let mut agent = Agent::new(0, [100.0, 100.0], blade());
        agent.vel = 3.0;
        let before = agent.pose();
        assert!(!agent.apply_action(Action::Pass));
        assert_eq!(agent.pose(), before);
    }

    #[test]
    fn actuators_clamp_at_limits() {
        let mut agent = Agent::new(0, [100.0, 100.0], blade());
        for _ in 0..30 {
            agent.apply_action(Action::SpeedUp);
            agent.apply_action(Action::Left);
            agent.apply_action(Action::BladeUp);
        }
        for _ in 0..60 {
            agent.apply_action(Action::YawLeft);
        }
        assert_eq!(agent.vel, MAX_SPEED);
        assert_eq!(agent.theta_dot, MAX_TURN_RATE);
        assert_eq!(agent.blade_pos, BLADE_POS_MAX);
        assert_eq!(agent.blade_yaw, MAX_BLADE_YAW);

        for _ in 0..30 {
            agent.apply_action(Action::SpeedDown);
            agent.apply_action(Action::Right);
            agent.apply_action(Action::BladeDown);
        }
        for _ in 0..120 {
            agent.apply_action(Action::YawRight);
        }
        assert_eq!(agent.vel, -MAX_SPEED);
        assert_eq!(agent.theta_dot, -MAX_TURN_RATE);
        assert_eq!(agent.blade_pos, BLADE_POS_MIN);
        assert_eq!(agent.blade_yaw, -MAX_BLADE_YAW);
    }

    #[test]
    fn heading_zero_drives_along_y() {
        let mut agent = Agent::new(0, [30.0, 30.0], blade());
        agent.vel = 2.0;
        agent.integrate(0.1, OPEN, OPEN);
        assert!((agent.position[0] - 30.0).abs() < 1e-12);
        assert!((agent.position[1] - 30.2).abs() < 1e-12);
    }

    #[test]
    fn heading_wraps_into_range() {
        let mut agent = Agent::new(0, [0.0, 0.0], blade());
        agent.theta_dot = -1.0;
        agent.integrate(0.1, OPEN, OPEN);
        assert!(agent.theta >= 0.0 && agent.theta < TAU);
        assert!((agent.theta - (TAU - 0.1)).abs() < 1e-9);
    }

    #[test]
    fn destination_outside_box_holds_nearest_bound() {
        let mut agent = Agent::new(0, [50.5, 50.5], blade());
        agent.vel = -10.0;
        agent.integrate(0.1, (50.0, 750.0), (50.0, 750.0));
        assert_eq!(agent.position, [50.5, 50.0]);
    }

    #[test]
    fn reset_restores_spawn_and_geometry() {
        let mut agent = Agent::new(3, [40.0, 60.0], blade());
        agent.position = [1.0, 2.0];
        agent.vel = 4.0;
        agent.theta = 1.0;
        agent.blade.width = 2;
        agent.blade_pos = -3.0;
        agent.reset();
        assert_eq!(agent.position, [40.0, 60.0]);
        assert_eq!(agent.vel, 0.0);
        assert_eq!(agent.theta, 0.0);
        assert_eq!(agent.blade, blade());
        assert_eq!(agent.blade_pos, 0.0);
    }
}
