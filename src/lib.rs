//! Baribari - a timed word-burst reaction game
//!
//! Core modules:
//! - `sim`: Deterministic round core (clock, spawner, scoring, scene state machine)
//! - `audio`: Best-effort voice feedback with autoplay-aware retries
//! - `config`: Validated game configuration
//! - `platform`: Browser/headless implementations of the surface and audio seams

pub mod audio;
pub mod config;
pub mod platform;
pub mod sim;

pub use audio::{AudioBackend, AudioFeedback, RetryPolicy};
pub use config::{DecoyPolicy, GameConfig};
pub use sim::{Scene, SceneController};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Words that can burst out of the origin
    pub const WORDS: [&str; 3] = ["バリバリ", "パリパリ", "ハリハリ"];
    /// The word the player has to collect
    pub const CORRECT_WORD: &str = "バリバリ";
    /// Voice asset per word
    pub const AUDIO_FILES: [(&str, &str); 3] = [
        ("バリバリ", "baribari-voice.mp3"),
        ("パリパリ", "paripari-voice.mp3"),
        ("ハリハリ", "harihari-voice.mp3"),
    ];

    /// Correct selections needed to clear a round
    pub const WIN_SCORE: u32 = 3;
    /// Round duration in seconds
    pub const GAME_TIME_SECS: u32 = 20;

    /// Countdown tick period
    pub const CLOCK_PERIOD_MS: f64 = 1000.0;
    /// One new word per second
    pub const SPAWN_PERIOD_MS: f64 = 1000.0;
    /// Spawn angle range is [-SPAWN_ANGLE_DEG, SPAWN_ANGLE_DEG]
    pub const SPAWN_ANGLE_DEG: f32 = 45.0;
    /// Travel distance of a word (viewport-height units)
    pub const TRAVEL_DISTANCE: f32 = 80.0;

    /// Win/lose banner stays up this long before the screen switches
    pub const ROUND_END_DELAY_MS: f64 = 2000.0;
    /// Banner auto-hide
    pub const BANNER_DURATION_MS: f64 = 2000.0;
    pub const WIN_MESSAGE: &str = "クリア！バリバリ達人！";
    pub const LOSE_MESSAGE: &str = "時間切れ！また挑戦してね";

    /// Output gain for voice playback (7% volume)
    pub const AUDIO_GAIN: f32 = 0.07;
    /// Shared retry budget for a single playback
    pub const MAX_PLAY_ATTEMPTS: u32 = 3;
    /// Backoff step; attempt N waits N * step
    pub const RETRY_STEP_MS: f64 = 300.0;
    /// Wait after (re)initialization or reload before retrying playback
    pub const RETRY_SETTLE_MS: f64 = 300.0;
    /// A context resume still pending after this long counts as failed
    pub const RESUME_TIMEOUT_MS: f64 = 1000.0;
}

/// Endpoint offset of a word travelling `distance` at `angle_deg` from vertical.
///
/// Horizontal drift is `sin(angle) * distance`; vertical is always `-distance` (upward).
#[inline]
pub fn burst_offset(angle_deg: f32, distance: f32) -> Vec2 {
    Vec2::new(angle_deg.to_radians().sin() * distance, -distance)
}
