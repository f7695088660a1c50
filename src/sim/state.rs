//! Race state types
//!
//! Balls, finish times and the ranking the presentation layer reads.

use serde::{Deserialize, Serialize};

use super::world::BodyHandle;

/// Vivid ball colors, cycled by ball index
pub const PALETTE: [u32; 20] = [
    0xFF0066, // magenta
    0xFF3300, // orange red
    0xFFFF00, // yellow
    0x00FF00, // green
    0x00FFFF, // cyan
    0x0066FF, // blue
    0x9900FF, // purple
    0xFF00FF, // fuchsia
    0xFF6600, // orange
    0x00FF99, // spring green
    0xFF0099, // deep pink
    0xFFCC00, // gold
    0x0099FF, // sky blue
    0xCC00FF, // violet
    0x00FFCC, // turquoise
    0xFF9900, // amber
    0x99FF00, // chartreuse
    0xFF0033, // crimson
    0x00CCFF, // deep sky blue
    0xFF33CC, // hot pink
];

/// Color for the ball at `index`. The cycle never exceeds the field size.
pub fn palette_color(index: usize, ball_count: usize) -> u32 {
    let modulus = ball_count.clamp(1, PALETTE.len());
    PALETTE[index % modulus]
}

/// `0xRRGGBB` as `#RRGGBB`
pub fn hex_color(color: u32) -> String {
    format!("#{:06X}", color & 0xFF_FFFF)
}

/// Stable ball identifier, 0-based spawn index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallId(pub u32);

/// Simulated finish time. `seq` orders finishes within the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FinishTime {
    pub tick: u64,
    pub seq: u32,
}

impl FinishTime {
    /// Seconds since race start
    pub fn seconds(&self, dt: f32) -> f64 {
        self.tick as f64 * dt as f64
    }
}

/// A racing ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    /// The ball's single body handle for the whole race
    pub body: BodyHandle,
    pub color: u32,
    pub radius: f32,
    pub finished_at: Option<FinishTime>,
}

impl Ball {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Record the finish. Returns false if already finished.
    pub fn finish(&mut self, time: FinishTime) -> bool {
        if self.finished_at.is_some() {
            return false;
        }
        self.finished_at = Some(time);
        true
    }

    /// Display name, 1-based
    pub fn name(&self) -> String {
        format!("Ball {}", self.id.0 + 1)
    }
}

/// Race lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RacePhase {
    #[default]
    Idle,
    Running,
}

/// One finished ball, in finish order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finisher {
    pub ball: BallId,
    pub time: FinishTime,
}

/// Finish order, ascending by finish time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ranking {
    entries: Vec<Finisher>,
}

impl Ranking {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a finisher keeping ascending order.
    /// Returns the 1-based position achieved, or None if the ball is already ranked.
    pub fn record(&mut self, ball: BallId, time: FinishTime) -> Option<usize> {
        if self.contains(ball) {
            return None;
        }
        let pos = self.entries.iter().position(|e| time < e.time);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, Finisher { ball, time });
                i + 1
            }
            None => {
                self.entries.push(Finisher { ball, time });
                self.entries.len()
            }
        };
        Some(rank)
    }

    pub fn contains(&self, ball: BallId) -> bool {
        self.entries.iter().any(|e| e.ball == ball)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[Finisher] {
        &self.entries
    }

    /// Ball ids in finish order
    pub fn order(&self) -> Vec<BallId> {
        self.entries.iter().map(|e| e.ball).collect()
    }

    /// Winner (if any)
    pub fn leader(&self) -> Option<BallId> {
        self.entries.first().map(|e| e.ball)
    }
}

/// Ranking row handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub id: u32,
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
    /// 1-based finish position
    pub position: usize,
}
