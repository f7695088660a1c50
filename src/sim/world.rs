//! Physics world seam
//!
//! The race core never integrates rigid bodies itself. It talks to a
//! physics engine through [`PhysicsWorld`]: create and remove bodies,
//! script kinematic poses, and step the world to collect collision-start
//! pairs for that step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::Material;

/// Stable handle to a body in a world. Never reused within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// What a body is, carried into collision notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyLabel {
    Wall,
    Goal,
    Platform,
    Obstacle,
    Ball,
}

/// Body geometry in local space (centered on the body position)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyShape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
    /// Regular polygon with `sides` vertices on a circle of `radius`
    Polygon { sides: u32, radius: f32 },
    /// Arbitrary closed outline (may be concave)
    Vertices(Vec<Vec2>),
}

impl BodyShape {
    /// Outline vertices in local space, `None` for circles
    pub fn local_vertices(&self) -> Option<Vec<Vec2>> {
        match self {
            BodyShape::Circle { .. } => None,
            BodyShape::Rectangle { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                Some(vec![
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                ])
            }
            BodyShape::Polygon { sides, radius } => {
                let sides = (*sides).max(3);
                let theta = std::f32::consts::TAU / sides as f32;
                let offset = theta * 0.5;
                Some(
                    (0..sides)
                        .map(|i| crate::polar_to_cartesian(*radius, offset + theta * i as f32))
                        .collect(),
                )
            }
            BodyShape::Vertices(vertices) => Some(vertices.clone()),
        }
    }

    /// Radius of the smallest origin-centered circle containing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            BodyShape::Circle { radius } => *radius,
            _ => self
                .local_vertices()
                .map(|vs| vs.iter().map(|v| v.length()).fold(0.0, f32::max))
                .unwrap_or(0.0),
        }
    }
}

/// How a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves
    Fixed,
    /// Moved only through [`PhysicsWorld::set_pose`], pushes dynamic bodies
    Kinematic,
    /// Integrated by the engine
    Dynamic,
}

/// Per-body creation options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyOptions {
    pub kind: BodyKind,
    /// Sensors report collisions but never push back
    pub is_sensor: bool,
    pub label: BodyLabel,
    pub material: Material,
}

impl BodyOptions {
    pub fn fixed(label: BodyLabel, material: Material) -> Self {
        Self {
            kind: BodyKind::Fixed,
            is_sensor: false,
            label,
            material,
        }
    }

    pub fn kinematic(label: BodyLabel, material: Material) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            ..Self::fixed(label, material)
        }
    }

    pub fn sensor(label: BodyLabel) -> Self {
        Self {
            is_sensor: true,
            ..Self::fixed(label, Material::COURSE)
        }
    }

    pub fn dynamic(label: BodyLabel, material: Material) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            ..Self::fixed(label, material)
        }
    }
}

/// Everything needed to create a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub shape: BodyShape,
    pub position: Vec2,
    pub angle: f32,
    pub options: BodyOptions,
}

/// Position and orientation of a body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
}

impl Pose {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }
}

/// One side of a collision pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairBody {
    pub handle: BodyHandle,
    pub label: BodyLabel,
}

/// Two bodies that started touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionPair {
    pub a: PairBody,
    pub b: PairBody,
}

impl CollisionPair {
    pub fn new(a: PairBody, b: PairBody) -> Self {
        Self { a, b }
    }

    /// If one side carries `label`, return (that side, the other side)
    pub fn split_by_label(&self, label: BodyLabel) -> Option<(PairBody, PairBody)> {
        if self.a.label == label {
            Some((self.a, self.b))
        } else if self.b.label == label {
            Some((self.b, self.a))
        } else {
            None
        }
    }
}

/// The physics engine as seen by the race
pub trait PhysicsWorld {
    /// Configure the world gravity (engine units)
    fn set_gravity(&mut self, gravity: Vec2);

    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Remove a body. Returns false if it was not present.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    fn contains(&self, handle: BodyHandle) -> bool;

    /// Move a body. Kinematic bodies reach the pose during the next step,
    /// others are teleported. Ignored for unknown handles.
    fn set_pose(&mut self, handle: BodyHandle, pose: Pose);

    fn pose(&self, handle: BodyHandle) -> Option<Pose>;

    /// Drop every body and all contact state
    fn clear(&mut self);

    fn body_count(&self) -> usize;

    /// Advance by `dt` seconds and return the pairs whose contact began
    fn step(&mut self, dt: f32) -> Vec<CollisionPair>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_vertices() {
        let shape = BodyShape::Rectangle {
            width: 40.0,
            height: 20.0,
        };
        let vs = shape.local_vertices().expect("polygon");
        assert_eq!(vs.len(), 4);
        assert!(vs.iter().all(|v| v.x.abs() == 20.0 && v.y.abs() == 10.0));
    }

    #[test]
    fn test_polygon_bounding_radius() {
        let shape = BodyShape::Polygon {
            sides: 3,
            radius: 50.0,
        };
        assert_eq!(shape.local_vertices().map(|v| v.len()), Some(3));
        assert!((shape.bounding_radius() - 50.0).abs() < 0.001);
        assert!(BodyShape::Circle { radius: 7.0 }.local_vertices().is_none());
    }

    #[test]
    fn test_split_by_label() {
        let goal = PairBody {
            handle: BodyHandle(1),
            label: BodyLabel::Goal,
        };
        let ball = PairBody {
            handle: BodyHandle(9),
            label: BodyLabel::Ball,
        };
        let pair = CollisionPair::new(ball, goal);
        assert_eq!(pair.split_by_label(BodyLabel::Goal), Some((goal, ball)));
        assert_eq!(pair.split_by_label(BodyLabel::Wall), None);
    }

    #[test]
    fn test_body_options() {
        let goal = BodyOptions::sensor(BodyLabel::Goal);
        assert!(goal.is_sensor);
        assert_eq!(goal.kind, BodyKind::Fixed);

        let bar = BodyOptions::kinematic(BodyLabel::Obstacle, Material::COURSE);
        assert_eq!(bar.kind, BodyKind::Kinematic);
        assert!(!bar.is_sensor);
        assert_eq!(
            BodyOptions::dynamic(BodyLabel::Ball, Material::BALL).kind,
            BodyKind::Dynamic
        );
    }
}
