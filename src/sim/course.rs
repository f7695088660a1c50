//! Procedural course generation
//!
//! One course per race: two stair-stepped funnel walls, a goal sensor strip
//! near the bottom, a randomly patterned set of spinning platforms and four
//! scripted obstacles. Generation only consumes the supplied RNG, so a seed
//! fully determines the layout. Courses are not checked for traversability.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_3, FRAC_PI_4, PI, TAU};

use super::motion::{MotionPattern, Trajectory};
use super::shape::{StaticShape, random_shape};
use crate::consts::*;
use crate::polar_to_cartesian;
use crate::settings::RaceSettings;

/// Platform layout algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutPattern {
    /// Golden-angle spiral, radius growing with sqrt(index)
    Spiral,
    /// Three concentric rings
    Radial,
    /// Four-column jittered grid
    Grid,
    /// Mirrored left/right pairs
    Symmetric,
}

impl LayoutPattern {
    pub const ALL: [LayoutPattern; 4] = [
        LayoutPattern::Spiral,
        LayoutPattern::Radial,
        LayoutPattern::Grid,
        LayoutPattern::Symmetric,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutPattern::Spiral => "spiral",
            LayoutPattern::Radial => "radial",
            LayoutPattern::Grid => "grid",
            LayoutPattern::Symmetric => "symmetric",
        }
    }
}

/// A static decorative obstacle that spins slowly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub shape: StaticShape,
    /// Radians per step
    pub rotation_speed: f32,
}

/// A bar that follows a scripted trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingObstacle {
    pub shape: StaticShape,
    pub trajectory: Trajectory,
}

/// Full geometry of one race track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub width: f32,
    pub height: f32,
    /// Platform layout used, `None` for courses without platforms
    pub pattern: Option<LayoutPattern>,
    pub walls: Vec<StaticShape>,
    pub goal: StaticShape,
    pub platforms: Vec<Platform>,
    pub obstacles: Vec<MovingObstacle>,
}

impl Course {
    /// Funnel and goal only, nothing in the way
    pub fn open(settings: &RaceSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            pattern: None,
            walls: funnel_walls(settings),
            goal: goal_strip(settings.width, settings.height),
            platforms: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    /// Total number of bodies the course inserts into a world
    pub fn body_count(&self) -> usize {
        self.walls.len() + 1 + self.platforms.len() + self.obstacles.len()
    }
}

/// Generate a complete course
pub fn generate_course<R: Rng + ?Sized>(rng: &mut R, settings: &RaceSettings) -> Course {
    let pattern = LayoutPattern::random(rng);
    let count = rng.random_range(MIN_PLATFORMS..=MAX_PLATFORMS);
    let platforms = layout_platforms(rng, pattern, count, settings.width, settings.height);

    log::debug!(
        "Course {}x{}: pattern={}, requested={}, placed={}",
        settings.width,
        settings.height,
        pattern.as_str(),
        count,
        platforms.len()
    );

    Course {
        pattern: Some(pattern),
        platforms,
        obstacles: moving_obstacles(settings.width, settings.height),
        ..Course::open(settings)
    }
}

/// Horizontal inset of each funnel step from the canvas edge, top to bottom.
/// Grows linearly from 0 to `(width - bottom_width) / 2`.
pub fn funnel_offsets(width: f32, segments: usize, bottom_ratio: f32) -> Vec<f32> {
    let max_offset = (width - width * bottom_ratio) / 2.0;
    let last = segments.saturating_sub(1).max(1) as f32;
    (0..segments)
        .map(|i| max_offset * i as f32 / last)
        .collect()
}

/// Left and right staircase walls (left steps first)
pub fn funnel_walls(settings: &RaceSettings) -> Vec<StaticShape> {
    let (width, height) = (settings.width, settings.height);
    let segments = settings.funnel_segments;
    let segment_height = height / segments as f32;
    let offsets = funnel_offsets(width, segments, settings.funnel_bottom_ratio);

    let step = |x: f32, i: usize| {
        let y = segment_height * (i as f32 + 0.5);
        StaticShape::bar(
            Vec2::new(x, y),
            WALL_THICKNESS,
            segment_height + WALL_OVERLAP,
        )
    };

    let left = offsets.iter().enumerate().map(|(i, &off)| step(off, i));
    let right = offsets.iter().enumerate().map(|(i, &off)| step(width - off, i));
    left.chain(right).collect()
}

/// Thin full-width strip near the bottom
pub fn goal_strip(width: f32, height: f32) -> StaticShape {
    StaticShape::bar(
        Vec2::new(width / 2.0, height - GOAL_INSET),
        width,
        GOAL_THICKNESS,
    )
}

/// Place platforms for `pattern`. The placed count can differ from `count`
/// for ring and mirrored layouts, which round down to whole rings/pairs.
pub fn layout_platforms<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: LayoutPattern,
    count: usize,
    width: f32,
    height: f32,
) -> Vec<Platform> {
    let center = Vec2::new(width * 0.5, height * 0.5);
    let span = width.min(height);
    // (position, tilt) per platform
    let mut spots: Vec<(Vec2, f32)> = Vec::with_capacity(count);

    match pattern {
        LayoutPattern::Spiral => {
            let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
            for i in 0..count {
                let angle = golden_angle * i as f32 + rng.random::<f32>() * 0.3;
                let radius = ((i + 1) as f32).sqrt() * span * (0.1 + rng.random::<f32>() * 0.04);
                let offset = polar_to_cartesian(radius, angle) * Vec2::new(1.0, 0.8);
                let tilt = angle + FRAC_PI_4 + rng.random::<f32>() * 0.5;
                spots.push((center + offset, tilt));
            }
        }

        LayoutPattern::Radial => {
            let layers = 3;
            let per_layer = count / layers;
            for layer in 0..layers {
                let radius = (layer + 1) as f32 * span * 0.15;
                let angle_step = TAU / per_layer as f32;
                for i in 0..per_layer {
                    let angle = angle_step * i as f32 + rng.random::<f32>() * 0.4;
                    let rx = radius * (0.9 + rng.random::<f32>() * 0.2);
                    let ry = radius * 0.7 * (0.9 + rng.random::<f32>() * 0.2);
                    let pos = center + Vec2::new(angle.cos() * rx, angle.sin() * ry);
                    let tilt = angle + rng.random::<f32>() * PI;
                    spots.push((pos, tilt));
                }
            }
        }

        LayoutPattern::Grid => {
            let cols = 4;
            let spacing = Vec2::new(width * 0.22, height * 0.2);
            let start = Vec2::new(width * 0.2, height * 0.15);
            for i in 0..count {
                let cell = Vec2::new((i % cols) as f32, (i / cols) as f32);
                let jitter = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5);
                let pos = start + cell * spacing + jitter * spacing * 0.3;
                let tilt = (rng.random::<f32>() - 0.5) * FRAC_PI_3;
                spots.push((pos, tilt));
            }
        }

        LayoutPattern::Symmetric => {
            let pairs = count / 2;
            for i in 0..pairs {
                let angle = TAU * i as f32 / pairs as f32 + rng.random::<f32>() * 0.2;
                let radius = span * (0.2 + rng.random::<f32>() * 0.15);
                let y = center.y + (rng.random::<f32>() - 0.5) * height * 0.6;
                let dx = angle.cos().abs() * radius;
                spots.push((Vec2::new(center.x - dx, y), angle));
                spots.push((Vec2::new(center.x + dx, y), -angle));
            }
        }
    }

    spots
        .into_iter()
        .map(|(pos, tilt)| {
            let size = width * (0.15 + rng.random::<f32>() * 0.1);
            Platform {
                shape: random_shape(rng, pos, tilt, size),
                rotation_speed: (rng.random::<f32>() - 0.5) * 2.0 * MAX_PLATFORM_SPIN,
            }
        })
        .collect()
}

/// The four scripted obstacles, one per vertical band
pub fn moving_obstacles(width: f32, height: f32) -> Vec<MovingObstacle> {
    let cx = width * 0.5;
    // (band, bar length, radii, speed, pattern); lengths and radii scale with width
    let table = [
        (0.25, 0.2, (0.2, 0.2), 1.5, MotionPattern::Circle),
        (0.45, 0.18, (0.25, 0.12), 1.2, MotionPattern::Ellipse),
        (
            0.65,
            0.16,
            (0.22, 0.15),
            1.0,
            MotionPattern::Lissajous {
                freq_x: 3.0,
                freq_y: 2.0,
            },
        ),
        (0.85, 0.2, (0.18, 0.1), 1.3, MotionPattern::FigureEight),
    ];

    table
        .into_iter()
        .map(|(band, length, (rx, ry), speed, pattern)| {
            let base = Vec2::new(cx, height * band);
            MovingObstacle {
                shape: StaticShape::bar(base, width * length, BAR_THICKNESS),
                trajectory: Trajectory {
                    pattern,
                    base,
                    radius: Vec2::new(width * rx, width * ry),
                    speed,
                },
            }
        })
        .collect()
}
