//! Marble Race - balls descending a procedurally generated course
//!
//! Core modules:
//! - `sim`: Deterministic race simulation (course, obstacle motion, ranking)
//! - `settings`: Race configuration surface

pub mod settings;
pub mod sim;

pub use settings::{FieldPreset, Material, RaceSettings, SettingsError, SpawnLayout};

use glam::Vec2;

/// Race configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Obstacle animation time advanced per step (not wall-clock)
    pub const MOTION_TIME_STEP: f32 = 0.01;

    /// Default canvas dimensions
    pub const DEFAULT_WIDTH: f32 = 800.0;
    pub const DEFAULT_HEIGHT: f32 = 1000.0;

    /// Gravity units to pixels/s²
    pub const GRAVITY_SCALE: f32 = 1000.0;
    /// Physics engine length unit, in pixels
    pub const PIXELS_PER_METER: f32 = 100.0;

    /// Funnel wall defaults
    pub const FUNNEL_SEGMENTS: usize = 8;
    pub const FUNNEL_BOTTOM_RATIO: f32 = 0.5;
    pub const WALL_THICKNESS: f32 = 40.0;
    /// Extra height per wall segment so consecutive steps overlap
    pub const WALL_OVERLAP: f32 = 10.0;

    /// Goal sensor strip
    pub const GOAL_THICKNESS: f32 = 10.0;
    /// Distance from the canvas bottom to the goal line center
    pub const GOAL_INSET: f32 = 30.0;

    /// Platform / obstacle bar thickness
    pub const BAR_THICKNESS: f32 = 20.0;

    /// Platform count range (inclusive)
    pub const MIN_PLATFORMS: usize = 6;
    pub const MAX_PLATFORMS: usize = 9;
    /// Max platform spin (radians per step, either direction)
    pub const MAX_PLATFORM_SPIN: f32 = 0.01;

    /// Ball radius as a fraction of min(width, height)
    pub const BALL_RADIUS_RATIO: f32 = 0.015;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}
