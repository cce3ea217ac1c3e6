//! Round state and core simulation types
//!
//! `GameState` is an owned value: the clock and the score resolver take it by
//! value and hand back the next one. Nothing else writes its fields.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::burst_offset;
use crate::config::GameConfig;

/// Screen the game is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scene {
    /// Title screen, waiting for the start command
    Start,
    /// Round in progress
    Playing,
    /// Win/lose banner is up; screen switches after the end delay
    RoundEnding(RoundOutcome),
    /// Victory screen with the restart control
    Clear,
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Win,
    Lose,
}

/// Result of a single resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Round keeps going
    Continue,
    /// Win threshold reached
    Win,
}

/// Per-round mutable state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(super) score: u32,
    pub(super) time_left: u32,
    pub(super) active: bool,
}

impl GameState {
    /// Inactive state shown on the start screen
    pub fn idle(config: &GameConfig) -> Self {
        Self {
            score: 0,
            time_left: config.game_time_secs,
            active: false,
        }
    }

    /// Fresh active round
    pub fn begin(config: &GameConfig) -> Self {
        Self {
            active: true,
            ..Self::idle(config)
        }
    }

    /// Same values, no longer accepting ticks or selections
    pub fn finish(self) -> Self {
        Self {
            active: false,
            ..self
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// A word emitted to the rendering surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnToken {
    /// Unique within the controller's lifetime
    pub id: u32,
    pub text: String,
    /// Where the word starts (surface coordinates)
    pub origin: Vec2,
    /// Direction from vertical, in [-range, range]
    pub angle_degrees: f32,
    pub travel_distance: f32,
    /// Queue time of emission (ms)
    pub created_at_ms: f64,
}

impl SpawnToken {
    /// Endpoint relative to `origin`
    pub fn end_offset(&self) -> Vec2 {
        burst_offset(self.angle_degrees, self.travel_distance)
    }
}

/// Things that happened, drained by the platform layer and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted,
    CountdownTick { time_left: u32 },
    TokenSpawned { id: u32, text: String },
    Resolved { text: String, delta: i32, score: u32 },
    RoundWon,
    RoundLost,
    ClearShown,
    ReturnedToStart,
}
