//! Deterministic race simulation
//!
//! All race logic lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by handle / ball id)
//! - Rigid-body physics only through the `PhysicsWorld` seam

pub mod course;
pub mod motion;
pub mod physics;
pub mod race;
pub mod shape;
pub mod state;
pub mod world;

pub use course::{Course, LayoutPattern, MovingObstacle, Platform, generate_course};
pub use motion::{MotionClock, MotionPattern, Spin, Trajectory};
pub use physics::RapierWorld;
pub use race::{ObstacleState, PlatformState, Race, spawn_positions};
pub use shape::{ShapeKind, StaticShape, random_shape, star_vertices};
pub use state::{Ball, BallId, FinishTime, Finisher, PALETTE, RacePhase, Ranking, RankingEntry};
pub use world::{
    BodyDesc, BodyHandle, BodyKind, BodyLabel, BodyOptions, BodyShape, CollisionPair, PairBody,
    PhysicsWorld, Pose,
};
