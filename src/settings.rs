//! Race settings
//!
//! Loaded from JSON; anything missing falls back to the defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Errors raised while loading or validating settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("ball count must be at least 2, got {0}")]
    BallCount(usize),

    #[error("canvas must have positive size, got {width}x{height}")]
    Canvas { width: f32, height: f32 },

    #[error("invalid funnel: {0}")]
    Funnel(String),

    #[error("time steps must be positive (sim_dt={sim_dt}, motion={motion})")]
    TimeStep { sim_dt: f32, motion: f32 },

    #[error("invalid {body} material: {reason}")]
    Material { body: &'static str, reason: String },
}

/// Observed field sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FieldPreset {
    Compact,
    #[default]
    Full,
}

impl FieldPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPreset::Compact => "Compact",
            FieldPreset::Full => "Full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compact" | "10" => Some(FieldPreset::Compact),
            "full" | "20" => Some(FieldPreset::Full),
            _ => None,
        }
    }

    /// Number of balls spawned
    pub fn ball_count(&self) -> usize {
        match self {
            FieldPreset::Compact => 10,
            FieldPreset::Full => 20,
        }
    }
}

/// How balls are placed in the start box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpawnLayout {
    /// Random positions, retried a few times to avoid overlap
    #[default]
    Scatter,
    /// Rows with every other row shifted by half a slot
    Staggered,
}

/// Per-body material constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    pub friction_static: f32,
    pub friction_air: f32,
    pub density: f32,
}

impl Material {
    /// Bouncy, slippery balls that barely lose energy
    pub const BALL: Material = Material {
        restitution: 0.98,
        friction: 0.001,
        friction_static: 0.0,
        friction_air: 0.0005,
        density: 0.001,
    };

    /// Walls, platforms and obstacles
    pub const COURSE: Material = Material {
        restitution: 0.8,
        friction: 0.001,
        friction_static: 0.5,
        friction_air: 0.01,
        density: 0.001,
    };

    /// Reject values the physics engine cannot integrate
    pub fn validate(&self, body: &'static str) -> Result<(), SettingsError> {
        let reason = if !(self.density > 0.0 && self.density.is_finite()) {
            format!("density must be positive, got {}", self.density)
        } else if !(0.0..=1.0).contains(&self.restitution) {
            format!("restitution must be in [0, 1], got {}", self.restitution)
        } else if !(self.friction >= 0.0 && self.friction_static >= 0.0) {
            format!(
                "friction must not be negative, got {}/{}",
                self.friction, self.friction_static
            )
        } else if !(0.0..=1.0).contains(&self.friction_air) {
            format!("air friction must be in [0, 1], got {}", self.friction_air)
        } else {
            return Ok(());
        };
        Err(SettingsError::Material { body, reason })
    }
}

/// Race configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Number of balls (2+). Drives spawn count, color cycling and the
    /// N-1 goal removal threshold.
    pub ball_count: usize,

    // === Canvas ===
    pub width: f32,
    pub height: f32,

    // === Physics ===
    /// Gravity in engine units (scaled by GRAVITY_SCALE to px/s²)
    pub gravity: Vec2,
    pub ball_material: Material,
    pub course_material: Material,

    // === Course ===
    pub spawn: SpawnLayout,
    pub funnel_segments: usize,
    /// Funnel opening at the bottom, as a fraction of width
    pub funnel_bottom_ratio: f32,

    // === Timing ===
    pub motion_time_step: f32,
    pub sim_dt: f32,
    /// Runner safety bound; races with wedged balls never complete
    pub max_steps: u64,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            ball_count: FieldPreset::Full.ball_count(),

            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,

            gravity: Vec2::new(0.0, 0.8),
            ball_material: Material::BALL,
            course_material: Material::COURSE,

            spawn: SpawnLayout::Scatter,
            funnel_segments: FUNNEL_SEGMENTS,
            funnel_bottom_ratio: FUNNEL_BOTTOM_RATIO,

            motion_time_step: MOTION_TIME_STEP,
            sim_dt: SIM_DT,
            max_steps: 20_000,
        }
    }
}

impl RaceSettings {
    /// Create settings from a field preset
    pub fn from_preset(preset: FieldPreset) -> Self {
        Self {
            ball_count: preset.ball_count(),
            ..Self::default()
        }
    }

    /// Apply a field preset
    pub fn apply_preset(&mut self, preset: FieldPreset) {
        self.ball_count = preset.ball_count();
    }

    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.ball_count < 2 {
            return Err(SettingsError::BallCount(self.ball_count));
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(SettingsError::Canvas {
                width: self.width,
                height: self.height,
            });
        }
        if self.funnel_segments < 2 {
            return Err(SettingsError::Funnel(format!(
                "need at least 2 segments, got {}",
                self.funnel_segments
            )));
        }
        if !(self.funnel_bottom_ratio > 0.0 && self.funnel_bottom_ratio <= 1.0) {
            return Err(SettingsError::Funnel(format!(
                "bottom ratio must be in (0, 1], got {}",
                self.funnel_bottom_ratio
            )));
        }
        if !(self.sim_dt > 0.0 && self.motion_time_step > 0.0) {
            return Err(SettingsError::TimeStep {
                sim_dt: self.sim_dt,
                motion: self.motion_time_step,
            });
        }
        self.ball_material.validate("ball")?;
        self.course_material.validate("course")?;
        Ok(())
    }

    /// Ball radius scaled to the canvas
    pub fn ball_radius(&self) -> f32 {
        self.width.min(self.height) * BALL_RADIUS_RATIO
    }

    /// Y of the goal line (top edge of the goal strip). Balls whose bottom
    /// reaches it have finished.
    pub fn goal_line_y(&self) -> f32 {
        self.height - GOAL_INSET - GOAL_THICKNESS / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RaceSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.ball_count, 20);
        assert!((settings.ball_radius() - 12.0).abs() < 0.001);
        assert!((settings.goal_line_y() - 965.0).abs() < 0.001);
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(FieldPreset::from_str("COMPACT"), Some(FieldPreset::Compact));
        assert_eq!(FieldPreset::from_str("20"), Some(FieldPreset::Full));
        assert_eq!(FieldPreset::from_str("huge"), None);
        assert_eq!(RaceSettings::from_preset(FieldPreset::Compact).ball_count, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = RaceSettings::from_json(r#"{"ball_count": 10, "spawn": "Staggered"}"#)
            .expect("valid settings");
        assert_eq!(settings.ball_count, 10);
        assert_eq!(settings.spawn, SpawnLayout::Staggered);
        assert_eq!(settings.funnel_segments, 8);
        assert!((settings.width - 800.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            RaceSettings::from_json(r#"{"ball_count": 1}"#),
            Err(SettingsError::BallCount(1))
        ));
        assert!(matches!(
            RaceSettings::from_json(r#"{"width": 0.0}"#),
            Err(SettingsError::Canvas { .. })
        ));
        assert!(matches!(
            RaceSettings::from_json(r#"{"funnel_segments": 1}"#),
            Err(SettingsError::Funnel(_))
        ));
        assert!(matches!(
            RaceSettings::from_json("not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_bad_materials() {
        let mut settings = RaceSettings::default();
        settings.ball_material.density = 0.0;
        let json = settings.to_json().expect("serialize");
        assert!(matches!(
            RaceSettings::from_json(&json),
            Err(SettingsError::Material { body: "ball", .. })
        ));

        let mut settings = RaceSettings::default();
        settings.course_material.restitution = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Material { body: "course", .. })
        ));

        let mut settings = RaceSettings::default();
        settings.ball_material.friction = -0.1;
        assert!(settings.validate().is_err());

        let mut settings = RaceSettings::default();
        settings.ball_material.density = f32::NAN;
        assert!(settings.validate().is_err());
        assert!(Material::COURSE.validate("course").is_ok());
    }

    #[test]
    fn test_apply_preset() {
        let mut settings = RaceSettings::default();
        settings.apply_preset(FieldPreset::Compact);
        assert_eq!(settings.ball_count, 10);
        assert_eq!(FieldPreset::Compact.as_str(), "Compact");
        assert_eq!(
            FieldPreset::from_str(FieldPreset::Full.as_str()),
            Some(FieldPreset::Full)
        );
    }

    #[test]
    fn test_json_roundtrip_keeps_materials() {
        let mut settings = RaceSettings::default();
        settings.ball_material.restitution = 0.9;
        let json = settings.to_json().expect("serialize");
        let back = RaceSettings::from_json(&json).expect("parse");
        assert_eq!(back.ball_material, settings.ball_material);
    }
}
