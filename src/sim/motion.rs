//! Scripted obstacle motion
//!
//! Platforms spin by a fixed amount per step. Moving obstacles follow a
//! closed-form trajectory of the accumulated motion time `t`, so their pose
//! never depends on the physics integration.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_4;

use super::world::Pose;

/// Parametric trajectory shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionPattern {
    Circle,
    /// Circle path with a half-rate spin
    Ellipse,
    Lissajous { freq_x: f32, freq_y: f32 },
    FigureEight,
}

impl MotionPattern {
    pub fn name(&self) -> &'static str {
        match self {
            MotionPattern::Circle => "circle",
            MotionPattern::Ellipse => "ellipse",
            MotionPattern::Lissajous { .. } => "lissajous",
            MotionPattern::FigureEight => "figure-eight",
        }
    }
}

/// A trajectory around a base point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub pattern: MotionPattern,
    pub base: Vec2,
    /// Per-axis radii
    pub radius: Vec2,
    /// Multiplier applied to the motion time
    pub speed: f32,
}

impl Trajectory {
    /// Pose at motion time `t`
    pub fn pose_at(&self, t: f32) -> Pose {
        let phase = t * self.speed;
        let (offset, angle) = match self.pattern {
            MotionPattern::Circle => (Vec2::new(phase.cos(), phase.sin()), phase),
            MotionPattern::Ellipse => (Vec2::new(phase.cos(), phase.sin()), 0.5 * phase),
            MotionPattern::Lissajous { freq_x, freq_y } => (
                Vec2::new((freq_x * phase).sin(), (freq_y * phase).sin()),
                phase.sin() * FRAC_PI_4,
            ),
            MotionPattern::FigureEight => (Vec2::new(phase.sin(), (2.0 * phase).sin()), phase),
        };
        Pose::new(self.base + offset * self.radius, angle)
    }
}

/// Spin state of one platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub angle: f32,
    /// Radians added per step
    pub rotation_speed: f32,
}

impl Spin {
    pub fn new(angle: f32, rotation_speed: f32) -> Self {
        Self {
            angle,
            rotation_speed,
        }
    }

    /// Apply one step of rotation. The angle grows without wrapping.
    pub fn advance(&mut self) -> f32 {
        self.angle += self.rotation_speed;
        self.angle
    }
}

/// Accumulated motion time, advanced by a fixed increment per step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionClock {
    pub time: f32,
    pub increment: f32,
}

impl MotionClock {
    pub fn new(increment: f32) -> Self {
        Self {
            time: 0.0,
            increment,
        }
    }

    pub fn advance(&mut self) -> f32 {
        self.time += self.increment;
        self.time
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn trajectory(pattern: MotionPattern) -> Trajectory {
        Trajectory {
            pattern,
            base: Vec2::new(400.0, 250.0),
            radius: Vec2::new(160.0, 80.0),
            speed: 1.5,
        }
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 0.01
    }

    #[test]
    fn test_circle_quarter_cycle() {
        let traj = trajectory(MotionPattern::Circle);

        let start = traj.pose_at(0.0);
        assert!(close(start.position, Vec2::new(560.0, 250.0)));
        assert!(start.angle.abs() < 1e-6);

        let quarter = traj.pose_at(PI / (2.0 * traj.speed));
        assert!(close(quarter.position, Vec2::new(400.0, 330.0)));
        assert!((quarter.angle - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_ellipse_spins_half_rate() {
        let circle = trajectory(MotionPattern::Circle).pose_at(1.0);
        let ellipse = trajectory(MotionPattern::Ellipse).pose_at(1.0);
        assert!(close(circle.position, ellipse.position));
        assert!((ellipse.angle - circle.angle * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_lissajous() {
        let traj = trajectory(MotionPattern::Lissajous {
            freq_x: 3.0,
            freq_y: 2.0,
        });
        let t = 0.4;
        let phase = t * traj.speed;
        let pose = traj.pose_at(t);
        let expected = Vec2::new(
            400.0 + (3.0 * phase).sin() * 160.0,
            250.0 + (2.0 * phase).sin() * 80.0,
        );
        assert!(close(pose.position, expected));
        assert!((pose.angle - phase.sin() * FRAC_PI_4).abs() < 1e-6);
        // Tilt stays within ±45°
        assert!(pose.angle.abs() <= FRAC_PI_4 + 1e-6);
    }

    #[test]
    fn test_figure_eight_crosses_base() {
        let traj = trajectory(MotionPattern::FigureEight);
        // sin(phase) and sin(2*phase) are both zero at phase = π
        let pose = traj.pose_at(PI / traj.speed);
        assert!(close(pose.position, traj.base));
        assert!((pose.angle - PI).abs() < 1e-4);
    }

    #[test]
    fn test_spin_accumulates_without_wrap() {
        let mut spin = Spin::new(3.0, 0.01);
        for _ in 0..1000 {
            spin.advance();
        }
        assert!((spin.angle - 13.0).abs() < 0.01);
    }

    #[test]
    fn test_clock_fixed_increment() {
        let mut clock = MotionClock::new(0.01);
        for _ in 0..100 {
            clock.advance();
        }
        assert!((clock.time - 1.0).abs() < 1e-4);
        clock.reset();
        assert_eq!(clock.time, 0.0);
    }
}
