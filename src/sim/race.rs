//! Race controller
//!
//! `Race` owns the physics world handle, the current course and the ball
//! registry. `start` builds a fresh race, `step` advances it by one fixed
//! step, and collision pairs reported by the world drive the ranking.
//! Balls are matched to bodies through a handle map, never by identity.

use std::collections::HashMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::course::{Course, generate_course};
use super::motion::{MotionClock, Spin, Trajectory};
use super::state::{
    Ball, BallId, FinishTime, Finisher, RacePhase, Ranking, RankingEntry, hex_color, palette_color,
};
use super::world::{
    BodyDesc, BodyHandle, BodyLabel, BodyOptions, BodyShape, CollisionPair, PhysicsWorld,
};
use crate::settings::{RaceSettings, SettingsError, SpawnLayout};

/// Attempts per ball to find a non-overlapping scatter position
const SPAWN_ATTEMPTS: usize = 16;
/// Columns in the staggered start grid
const STAGGER_COLUMNS: usize = 5;

/// A spinning platform in the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformState {
    pub body: BodyHandle,
    pub spin: Spin,
}

/// A scripted obstacle in the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleState {
    pub body: BodyHandle,
    pub trajectory: Trajectory,
}

/// Everything that exists only while a race runs
#[derive(Debug)]
struct Session {
    course: Course,
    walls: Vec<BodyHandle>,
    goal: Option<BodyHandle>,
    platforms: Vec<PlatformState>,
    obstacles: Vec<ObstacleState>,
    balls: Vec<Ball>,
    by_body: HashMap<BodyHandle, BallId>,
    ranking: Ranking,
    clock: MotionClock,
    tick: u64,
    next_seq: u32,
}

/// A single race over a physics world
pub struct Race<W: PhysicsWorld> {
    world: W,
    settings: RaceSettings,
    rng: Pcg32,
    /// Seed `rng` was built from, when known
    seed: Option<u64>,
    phase: RacePhase,
    session: Option<Session>,
}

impl<W: PhysicsWorld> Race<W> {
    /// Create an idle race. The world gravity is configured here, once.
    pub fn new(mut world: W, settings: RaceSettings, rng: Pcg32) -> Result<Self, SettingsError> {
        settings.validate()?;
        world.set_gravity(settings.gravity);
        Ok(Self {
            world,
            settings,
            rng,
            seed: None,
            phase: RacePhase::Idle,
            session: None,
        })
    }

    pub fn with_seed(world: W, settings: RaceSettings, seed: u64) -> Result<Self, SettingsError> {
        let mut race = Self::new(world, settings, Pcg32::seed_from_u64(seed))?;
        race.seed = Some(seed);
        Ok(race)
    }

    /// Drop all bodies and race state. Safe to call at any time.
    pub fn reset(&mut self) {
        self.world.clear();
        self.session = None;
        self.phase = RacePhase::Idle;
        log::debug!("Race reset");
    }

    /// Reset, generate a new course and spawn the configured balls
    pub fn start(&mut self) {
        let course = generate_course(&mut self.rng, &self.settings);
        let spawns = spawn_positions(&mut self.rng, &self.settings);
        self.start_with(course, &spawns);
    }

    /// Reset and start on a given course with one ball per spawn point
    pub fn start_with(&mut self, course: Course, spawns: &[Vec2]) {
        self.reset();

        let material = self.settings.course_material;
        let world = &mut self.world;

        let walls = course
            .walls
            .iter()
            .map(|w| world.add_body(w.to_desc(BodyOptions::fixed(BodyLabel::Wall, material))))
            .collect();
        let goal = world.add_body(course.goal.to_desc(BodyOptions::sensor(BodyLabel::Goal)));
        let platforms = course
            .platforms
            .iter()
            .map(|p| PlatformState {
                body: world.add_body(
                    p.shape
                        .to_desc(BodyOptions::kinematic(BodyLabel::Platform, material)),
                ),
                spin: Spin::new(p.shape.angle, p.rotation_speed),
            })
            .collect();
        let obstacles = course
            .obstacles
            .iter()
            .map(|o| {
                // Start on the trajectory so the first scripted move is small
                let start = o.trajectory.pose_at(0.0);
                let desc = BodyDesc {
                    position: start.position,
                    angle: start.angle,
                    ..o.shape.to_desc(BodyOptions::kinematic(BodyLabel::Obstacle, material))
                };
                ObstacleState {
                    body: world.add_body(desc),
                    trajectory: o.trajectory,
                }
            })
            .collect();

        let radius = self.settings.ball_radius();
        let mut balls = Vec::with_capacity(spawns.len());
        let mut by_body = HashMap::with_capacity(spawns.len());
        for (i, &position) in spawns.iter().enumerate() {
            let id = BallId(i as u32);
            let body = world.add_body(BodyDesc {
                shape: BodyShape::Circle { radius },
                position,
                angle: 0.0,
                options: BodyOptions::dynamic(BodyLabel::Ball, self.settings.ball_material),
            });
            by_body.insert(body, id);
            balls.push(Ball {
                id,
                body,
                color: palette_color(i, spawns.len()),
                radius,
                finished_at: None,
            });
        }

        log::info!(
            "Race started: seed={}, pattern={}, platforms={}, obstacles={}, balls={}",
            self.seed.map_or_else(|| "injected".to_string(), |s| s.to_string()),
            course.pattern.map_or("none", |p| p.as_str()),
            course.platforms.len(),
            course.obstacles.len(),
            balls.len()
        );

        self.session = Some(Session {
            course,
            walls,
            goal: Some(goal),
            platforms,
            obstacles,
            balls,
            by_body,
            ranking: Ranking::new(),
            clock: MotionClock::new(self.settings.motion_time_step),
            tick: 0,
            next_seq: 0,
        });
        self.phase = RacePhase::Running;
        self.remove_goal_if_last();
    }

    /// Advance one simulation step: scripted poses, physics, then finishes
    pub fn step(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let t = session.clock.advance();
        for platform in &mut session.platforms {
            let angle = platform.spin.advance();
            if let Some(mut pose) = self.world.pose(platform.body) {
                pose.angle = angle;
                self.world.set_pose(platform.body, pose);
            }
        }
        for obstacle in &session.obstacles {
            self.world
                .set_pose(obstacle.body, obstacle.trajectory.pose_at(t));
        }

        let pairs = self.world.step(self.settings.sim_dt);
        session.tick += 1;

        self.handle_collisions(&pairs);
        self.finish_line_crossers();
    }

    /// Record finishes for ball/goal pairs. Repeated pairs for a finished
    /// ball are ignored.
    pub fn handle_collisions(&mut self, pairs: &[CollisionPair]) {
        for pair in pairs {
            let Some(session) = self.session.as_ref() else {
                return;
            };
            let Some((goal, other)) = pair.split_by_label(BodyLabel::Goal) else {
                continue;
            };
            if session.goal != Some(goal.handle) {
                continue;
            }
            let Some(&id) = session.by_body.get(&other.handle) else {
                continue;
            };
            self.finish_ball(id, true);
        }
    }

    /// Once the goal sensor is gone, balls that reach the goal line are
    /// recorded without being stopped.
    fn finish_line_crossers(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.goal.is_some() {
            return;
        }
        let line_top = self.settings.goal_line_y();
        let crossed: Vec<BallId> = session
            .balls
            .iter()
            .filter(|b| !b.is_finished())
            .filter(|b| {
                self.world
                    .pose(b.body)
                    .is_some_and(|p| p.position.y + b.radius >= line_top)
            })
            .map(|b| b.id)
            .collect();

        for id in crossed {
            self.finish_ball(id, false);
        }
    }

    fn finish_ball(&mut self, id: BallId, remove_body: bool) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let time = FinishTime {
            tick: session.tick,
            seq: session.next_seq,
        };
        let Some(ball) = session.balls.get_mut(id.0 as usize) else {
            return false;
        };
        if !ball.finish(time) {
            return false;
        }
        session.next_seq += 1;
        let body = ball.body;
        let position = session.ranking.record(id, time).unwrap_or(session.ranking.len());

        if remove_body {
            self.world.remove_body(body);
        }
        log::info!(
            "Ball {} finished #{} at tick {} ({:.2}s)",
            id.0 + 1,
            position,
            time.tick,
            time.seconds(self.settings.sim_dt)
        );

        self.remove_goal_if_last();
        if self.is_complete() {
            log::info!("Race complete after {} ticks", time.tick);
        }
        true
    }

    /// Pull the goal sensor once only one ball is left running
    fn remove_goal_if_last(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let threshold = session.balls.len().saturating_sub(1);
        if session.ranking.len() < threshold {
            return;
        }
        if let Some(goal) = session.goal.take() {
            self.world.remove_body(goal);
            log::info!(
                "Goal sensor removed with {} of {} finished",
                session.ranking.len(),
                session.balls.len()
            );
        }
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RacePhase::Running
    }

    /// Every ball has a finish time
    pub fn is_complete(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.ranking.len() == s.balls.len())
    }

    pub fn settings(&self) -> &RaceSettings {
        &self.settings
    }

    /// Seed of the race RNG, `None` when an RNG was injected
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn course(&self) -> Option<&Course> {
        self.session.as_ref().map(|s| &s.course)
    }

    pub fn balls(&self) -> &[Ball] {
        self.session.as_ref().map_or(&[], |s| &s.balls)
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls().get(id.0 as usize)
    }

    pub fn goal(&self) -> Option<BodyHandle> {
        self.session.as_ref().and_then(|s| s.goal)
    }

    pub fn walls(&self) -> &[BodyHandle] {
        self.session.as_ref().map_or(&[], |s| &s.walls)
    }

    pub fn platforms(&self) -> &[PlatformState] {
        self.session.as_ref().map_or(&[], |s| &s.platforms)
    }

    pub fn obstacles(&self) -> &[ObstacleState] {
        self.session.as_ref().map_or(&[], |s| &s.obstacles)
    }

    /// Finishers in finish order
    pub fn ranking(&self) -> &[Finisher] {
        self.session.as_ref().map_or(&[], |s| s.ranking.entries())
    }

    /// Ranking rows for display
    pub fn ranking_entries(&self) -> Vec<RankingEntry> {
        self.ranking()
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                let ball = self.ball(f.ball)?;
                Some(RankingEntry {
                    id: ball.id.0,
                    name: ball.name(),
                    color: hex_color(ball.color),
                    position: i + 1,
                })
            })
            .collect()
    }

    pub fn tick(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.tick)
    }

    pub fn motion_time(&self) -> f32 {
        self.session.as_ref().map_or(0.0, |s| s.clock.time)
    }
}

/// Start positions for the configured ball count, near the top of the canvas
pub fn spawn_positions<R: Rng + ?Sized>(rng: &mut R, settings: &RaceSettings) -> Vec<Vec2> {
    let (width, height) = (settings.width, settings.height);
    let count = settings.ball_count;
    let radius = settings.ball_radius();
    let origin = Vec2::new(width * 0.2, height * 0.05);
    let area = Vec2::new(width * 0.6, height * 0.15);

    match settings.spawn {
        SpawnLayout::Scatter => {
            let min_gap = radius * 2.0 + 2.0;
            let mut placed: Vec<Vec2> = Vec::with_capacity(count);
            for _ in 0..count {
                let is_free = |p: Vec2| placed.iter().all(|q| q.distance(p) >= min_gap);
                let random = (0..SPAWN_ATTEMPTS)
                    .map(|_| origin + Vec2::new(rng.random::<f32>(), rng.random::<f32>()) * area)
                    .find(|&p| is_free(p));
                // Out of luck: take the first free cell of a min_gap grid
                let candidate = random
                    .or_else(|| scan_grid(origin, area, min_gap).find(|&p| is_free(p)))
                    .unwrap_or(origin);
                placed.push(candidate);
            }
            placed
        }

        SpawnLayout::Staggered => {
            let slot = area.x / STAGGER_COLUMNS as f32;
            let row_gap = radius * 3.0;
            (0..count)
                .map(|i| {
                    let (row, col) = (i / STAGGER_COLUMNS, i % STAGGER_COLUMNS);
                    let shift = if row % 2 == 1 { slot * 0.5 } else { 0.0 };
                    let jitter = (rng.random::<f32>() - 0.5) * slot * 0.2;
                    origin
                        + Vec2::new(
                            slot * (col as f32 + 0.25) + shift + jitter,
                            row as f32 * row_gap,
                        )
                })
                .collect()
        }
    }
}

/// Row-major grid points covering the box `origin..origin + area`
fn scan_grid(origin: Vec2, area: Vec2, spacing: f32) -> impl Iterator<Item = Vec2> {
    let cols = (area.x / spacing) as usize + 1;
    let rows = (area.y / spacing) as usize + 1;
    (0..rows).flat_map(move |row| {
        (0..cols).map(move |col| origin + Vec2::new(col as f32, row as f32) * spacing)
    })
}
