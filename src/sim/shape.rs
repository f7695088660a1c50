//! Static shape generation for course primitives

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

use super::world::{BodyDesc, BodyOptions, BodyShape};
use crate::consts::BAR_THICKNESS;

/// Star point count
pub const STAR_POINTS: usize = 5;
/// Outer / inner star radii as a fraction of the requested size
pub const STAR_OUTER_RATIO: f32 = 0.4;
pub const STAR_INNER_RATIO: f32 = 0.18;
/// Triangle circumradius as a fraction of the requested size
pub const TRIANGLE_RATIO: f32 = 0.4;

/// The primitive a platform is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Triangle,
    Star,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Rectangle, ShapeKind::Triangle, ShapeKind::Star];

    /// Uniform pick among the three kinds
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// A static shape placed in the course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticShape {
    pub kind: ShapeKind,
    pub shape: BodyShape,
    pub center: Vec2,
    pub angle: f32,
}

impl StaticShape {
    /// Axis-aligned bar (walls, goal strip, obstacle bars)
    pub fn bar(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            shape: BodyShape::Rectangle { width, height },
            center,
            angle: 0.0,
        }
    }

    /// Body descriptor for inserting the shape into a world
    pub fn to_desc(&self, options: BodyOptions) -> BodyDesc {
        BodyDesc {
            shape: self.shape.clone(),
            position: self.center,
            angle: self.angle,
            options,
        }
    }
}

/// Build a shape of the given kind
pub fn build_shape(kind: ShapeKind, center: Vec2, angle: f32, size: f32) -> StaticShape {
    let shape = match kind {
        ShapeKind::Rectangle => BodyShape::Rectangle {
            width: size,
            height: BAR_THICKNESS,
        },
        ShapeKind::Triangle => BodyShape::Polygon {
            sides: 3,
            radius: size * TRIANGLE_RATIO,
        },
        ShapeKind::Star => BodyShape::Vertices(star_vertices(size)),
    };

    StaticShape {
        kind,
        shape,
        center,
        angle,
    }
}

/// Rectangle, triangle or star, chosen uniformly at random
pub fn random_shape<R: Rng + ?Sized>(rng: &mut R, center: Vec2, angle: f32, size: f32) -> StaticShape {
    build_shape(ShapeKind::random(rng), center, angle, size)
}

/// Five-pointed star outline, alternating outer/inner vertices.
/// The first vertex points straight up (negative y).
pub fn star_vertices(size: f32) -> Vec<Vec2> {
    let outer = size * STAR_OUTER_RATIO;
    let inner = size * STAR_INNER_RATIO;
    let count = STAR_POINTS * 2;

    (0..count)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let theta = TAU * i as f32 / count as f32 - FRAC_PI_2;
            Vec2::new(theta.cos() * radius, theta.sin() * radius)
        })
        .collect()
}
