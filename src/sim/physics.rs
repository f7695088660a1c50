//! Rapier-backed physics world
//!
//! Balls are dynamic rigid bodies, walls and the goal are fixed, and
//! platforms and obstacles are kinematic bodies driven by `set_pose`.
//! Collision-start events come out of a `ChannelEventCollector` and are
//! handed back sorted by body handle so a run is reproducible.

use std::collections::BTreeMap;

use glam::Vec2;
use rapier2d::crossbeam::channel::{Receiver, unbounded};
use rapier2d::prelude::*;

use super::world::{
    BodyDesc, BodyHandle, BodyKind, BodyLabel, BodyShape, CollisionPair, PairBody, PhysicsWorld,
    Pose,
};
use crate::consts::{GRAVITY_SCALE, PIXELS_PER_METER, SIM_DT};

#[derive(Debug, Clone, Copy)]
struct Entry {
    body: RigidBodyHandle,
    label: BodyLabel,
}

/// [`PhysicsWorld`] over a rapier2d pipeline
pub struct RapierWorld {
    gravity: Vector<Real>,
    integration: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    events: ChannelEventCollector,
    collision_recv: Receiver<CollisionEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
    entries: BTreeMap<BodyHandle, Entry>,
    next_handle: u32,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        let (collision_send, collision_recv) = unbounded();
        let (contact_force_send, contact_force_recv) = unbounded();
        Self {
            gravity: Vector::new(0.0, GRAVITY_SCALE),
            integration: IntegrationParameters {
                length_unit: PIXELS_PER_METER,
                ..IntegrationParameters::default()
            },
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            events: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_recv,
            contact_force_recv,
            entries: BTreeMap::new(),
            next_handle: 1,
        }
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        let body = self.bodies.get(self.entries.get(&handle)?.body)?;
        Some(to_vec2(body.linvel()))
    }

    /// Handles in ascending order
    pub fn handles(&self) -> Vec<BodyHandle> {
        self.entries.keys().copied().collect()
    }

    fn pair_body(&self, collider: ColliderHandle) -> Option<PairBody> {
        let handle = BodyHandle(self.colliders.get(collider)?.user_data as u32);
        let entry = self.entries.get(&handle)?;
        Some(PairBody {
            handle,
            label: entry.label,
        })
    }

    fn drain_events(&mut self) {
        self.collision_recv.try_iter().for_each(drop);
        self.contact_force_recv.try_iter().for_each(drop);
    }
}

impl PhysicsWorld for RapierWorld {
    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = to_vector(gravity * GRAVITY_SCALE);
    }

    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;

        let options = desc.options;
        let material = options.material;
        let builder = match options.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            // Scripted every step, so never parked in a sleeping island
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based().can_sleep(false),
            // Air friction is tuned per 60 Hz frame
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .linear_damping(material.friction_air / SIM_DT)
                .ccd_enabled(true),
        };
        let body = builder
            .translation(to_vector(desc.position))
            .rotation(desc.angle)
            .user_data(handle.0 as u128)
            .build();
        let body = self.bodies.insert(body);

        let collider = collider_for(&desc.shape)
            .sensor(options.is_sensor)
            .restitution(material.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .friction(material.friction)
            .density(material.density)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(handle.0 as u128)
            .build();
        self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        self.entries.insert(
            handle,
            Entry {
                body,
                label: options.label,
            },
        );
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(entry) = self.entries.remove(&handle) else {
            return false;
        };
        self.bodies.remove(
            entry.body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    fn set_pose(&mut self, handle: BodyHandle, pose: Pose) {
        let Some(body) = self
            .entries
            .get(&handle)
            .and_then(|e| self.bodies.get_mut(e.body))
        else {
            return;
        };
        let position = Isometry::new(to_vector(pose.position), pose.angle);
        if body.is_kinematic() {
            body.set_next_kinematic_position(position);
        } else {
            body.set_position(position, true);
        }
    }

    fn pose(&self, handle: BodyHandle) -> Option<Pose> {
        let body = self.bodies.get(self.entries.get(&handle)?.body)?;
        Some(Pose::new(to_vec2(body.translation()), body.rotation().angle()))
    }

    fn clear(&mut self) {
        self.pipeline = PhysicsPipeline::new();
        self.islands = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.ccd = CCDSolver::new();
        self.entries.clear();
        self.drain_events();
    }

    fn body_count(&self) -> usize {
        self.entries.len()
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        self.integration.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.events,
        );
        self.contact_force_recv.try_iter().for_each(drop);

        let mut pairs: Vec<CollisionPair> = self
            .collision_recv
            .try_iter()
            .filter(|event| event.started())
            .filter_map(|event| {
                let a = self.pair_body(event.collider1())?;
                let b = self.pair_body(event.collider2())?;
                Some(if a.handle <= b.handle {
                    CollisionPair::new(a, b)
                } else {
                    CollisionPair::new(b, a)
                })
            })
            .collect();
        pairs.sort_by_key(|p| (p.a.handle, p.b.handle));
        pairs.dedup();
        pairs
    }
}

fn to_vector(v: Vec2) -> Vector<Real> {
    Vector::new(v.x, v.y)
}

fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Collider geometry. Concave outlines (stars) are decomposed into convex parts.
fn collider_for(shape: &BodyShape) -> ColliderBuilder {
    let fallback = || ColliderBuilder::ball(shape.bounding_radius().max(1.0));
    match shape {
        BodyShape::Circle { radius } => ColliderBuilder::ball(*radius),
        BodyShape::Rectangle { width, height } => {
            ColliderBuilder::cuboid(width / 2.0, height / 2.0)
        }
        BodyShape::Polygon { .. } => {
            ColliderBuilder::convex_hull(&outline_points(shape)).unwrap_or_else(fallback)
        }
        BodyShape::Vertices(_) => {
            let points = outline_points(shape);
            if points.len() < 3 {
                return fallback();
            }
            let n = points.len() as u32;
            let indices: Vec<[u32; 2]> = (0..n).map(|i| [i, (i + 1) % n]).collect();
            ColliderBuilder::convex_decomposition(&points, &indices)
        }
    }
}

fn outline_points(shape: &BodyShape) -> Vec<Point<Real>> {
    shape
        .local_vertices()
        .unwrap_or_default()
        .into_iter()
        .map(|v| Point::new(v.x, v.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Material;
    use crate::sim::shape::star_vertices;
    use crate::sim::world::BodyOptions;

    fn ball_desc(position: Vec2) -> BodyDesc {
        BodyDesc {
            shape: BodyShape::Circle { radius: 12.0 },
            position,
            angle: 0.0,
            options: BodyOptions::dynamic(BodyLabel::Ball, Material::BALL),
        }
    }

    fn bar_desc(position: Vec2, width: f32, height: f32, options: BodyOptions) -> BodyDesc {
        BodyDesc {
            shape: BodyShape::Rectangle { width, height },
            position,
            angle: 0.0,
            options,
        }
    }

    fn world() -> RapierWorld {
        let mut world = RapierWorld::new();
        world.set_gravity(Vec2::new(0.0, 0.8));
        world
    }

    #[test]
    fn test_ball_falls() {
        let mut world = world();
        let ball = world.add_body(ball_desc(Vec2::new(100.0, 100.0)));
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        let pose = world.pose(ball).expect("ball");
        assert!(pose.position.y > 150.0);
        assert!((pose.position.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_sensor_reports_once() {
        let mut world = world();
        let goal = world.add_body(bar_desc(
            Vec2::new(400.0, 970.0),
            800.0,
            10.0,
            BodyOptions::sensor(BodyLabel::Goal),
        ));
        let ball = world.add_body(ball_desc(Vec2::new(400.0, 900.0)));

        let mut hits = 0;
        for _ in 0..120 {
            for pair in world.step(1.0 / 60.0) {
                let (g, other) = pair.split_by_label(BodyLabel::Goal).expect("goal pair");
                assert_eq!(g.handle, goal);
                assert_eq!(other.handle, ball);
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
        // Sensor never stopped the ball
        assert!(world.pose(ball).expect("ball").position.y > 1000.0);
    }

    #[test]
    fn test_ball_bounces_off_bar() {
        let mut world = world();
        world.add_body(bar_desc(
            Vec2::new(400.0, 300.0),
            200.0,
            20.0,
            BodyOptions::fixed(BodyLabel::Platform, Material::COURSE),
        ));
        let ball = world.add_body(ball_desc(Vec2::new(400.0, 100.0)));

        let mut bounced = false;
        for _ in 0..90 {
            world.step(1.0 / 60.0);
            let pose = world.pose(ball).expect("ball");
            assert!(pose.position.y < 290.0, "ball tunneled: {}", pose.position.y);
            bounced |= world.velocity(ball).expect("ball").y < 0.0;
        }
        assert!(bounced);
    }

    #[test]
    fn test_overlapping_balls_separate() {
        let mut world = world();
        let a = world.add_body(ball_desc(Vec2::new(400.0, 100.0)));
        let b = world.add_body(ball_desc(Vec2::new(405.0, 100.0)));
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        let (pa, pb) = (world.pose(a).expect("a"), world.pose(b).expect("b"));
        assert!(pa.position.is_finite() && pb.position.is_finite());
        assert!(pa.position.distance(pb.position) > 5.0);
    }

    #[test]
    fn test_handles_not_reused() {
        let mut world = world();
        let a = world.add_body(ball_desc(Vec2::ZERO));
        assert!(world.remove_body(a));
        assert!(!world.remove_body(a));
        assert!(world.pose(a).is_none());
        let b = world.add_body(ball_desc(Vec2::ZERO));
        assert_ne!(a, b);
        world.clear();
        assert_eq!(world.body_count(), 0);
        assert!(world.handles().is_empty());
        let c = world.add_body(ball_desc(Vec2::ZERO));
        assert!(c > b);
    }

    #[test]
    fn test_kinematic_pose() {
        let mut world = world();
        let bar = world.add_body(bar_desc(
            Vec2::ZERO,
            100.0,
            20.0,
            BodyOptions::kinematic(BodyLabel::Obstacle, Material::COURSE),
        ));
        world.set_pose(bar, Pose::new(Vec2::new(50.0, 60.0), 1.0));
        world.step(1.0 / 60.0);
        let pose = world.pose(bar).expect("bar");
        assert!((pose.position - Vec2::new(50.0, 60.0)).length() < 1e-3);
        assert!((pose.angle - 1.0).abs() < 1e-4);

        // Fixed bodies are teleported right away and ignore gravity
        let wall = world.add_body(bar_desc(
            Vec2::ZERO,
            40.0,
            100.0,
            BodyOptions::fixed(BodyLabel::Wall, Material::COURSE),
        ));
        world.set_pose(wall, Pose::new(Vec2::new(10.0, 20.0), 0.0));
        world.step(1.0 / 60.0);
        assert_eq!(world.pose(wall).map(|p| p.position), Some(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn test_star_platform_blocks_ball() {
        let mut world = world();
        world.add_body(BodyDesc {
            shape: BodyShape::Vertices(star_vertices(200.0)),
            position: Vec2::new(400.0, 300.0),
            angle: 0.0,
            options: BodyOptions::fixed(BodyLabel::Platform, Material::COURSE),
        });
        let ball = world.add_body(ball_desc(Vec2::new(400.0, 150.0)));
        let (mut touched, mut bounced) = (false, false);
        for _ in 0..40 {
            touched |= world
                .step(1.0 / 60.0)
                .iter()
                .any(|p| p.split_by_label(BodyLabel::Platform).is_some());
            bounced |= world.velocity(ball).expect("ball").y < 0.0;
        }
        assert!(touched);
        assert!(bounced);
    }
}
