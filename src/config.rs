//! Game configuration
//!
//! Fixed for the lifetime of the process. Defaults come from `crate::consts`;
//! the native build can override them from a JSON file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::RetryPolicy;
use crate::consts::*;

/// What a decoy selection does to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DecoyPolicy {
    /// Decoys cost one point (never below zero)
    #[default]
    Penalty,
    /// Decoys are harmless
    Ignore,
}

impl DecoyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoyPolicy::Penalty => "Penalty",
            DecoyPolicy::Ignore => "Ignore",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "penalty" | "on" => Some(DecoyPolicy::Penalty),
            "ignore" | "off" => Some(DecoyPolicy::Ignore),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("vocabulary is empty")]
    EmptyVocabulary,
    #[error("correct word '{0}' is not part of the vocabulary")]
    CorrectWordMissing(String),
    #[error("win score must be at least 1")]
    ZeroWinScore,
    #[error("round duration must be at least 1 second")]
    ZeroDuration,
    #[error("{name} must be a positive number of milliseconds, got {value}")]
    BadPeriod { name: &'static str, value: f64 },
    #[error("spawn angle must be within [0, 90] degrees, got {0}")]
    AngleOutOfRange(f32),
    #[error("travel distance must be positive, got {0}")]
    BadDistance(f32),
    #[error("audio gain must be within [0, 1], got {0}")]
    GainOutOfRange(f32),
    #[error("retry budget must allow at least one attempt")]
    ZeroRetryBudget,
}

/// Voice feedback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Fixed output level (not adjustable at runtime)
    pub gain: f32,
    /// Asset identifier per word
    pub assets: BTreeMap<String, String>,
    /// Shared retry budget and backoff
    pub retry: RetryPolicy,
}

impl AudioConfig {
    /// Asset identifier for a word's voice clip
    pub fn asset_for(&self, word: &str) -> Option<&str> {
        self.assets.get(word).map(String::as_str)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            gain: AUDIO_GAIN,
            assets: AUDIO_FILES
                .iter()
                .map(|(word, file)| (word.to_string(), file.to_string()))
                .collect(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Words that can spawn
    pub vocabulary: Vec<String>,
    /// The target word; every other vocabulary word is a decoy
    pub correct_word: String,
    /// Correct selections needed to win
    pub win_score: u32,
    /// Round duration in seconds
    pub game_time_secs: u32,
    pub clock_period_ms: f64,
    pub spawn_period_ms: f64,
    /// Half-width of the spawn cone in degrees
    pub spawn_angle_deg: f32,
    pub travel_distance: f32,
    /// Banner display time before the screen switches at round end
    pub round_end_delay_ms: f64,
    pub banner_duration_ms: f64,
    pub decoy_policy: DecoyPolicy,
    pub audio: AudioConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            vocabulary: WORDS.iter().map(|w| w.to_string()).collect(),
            correct_word: CORRECT_WORD.to_string(),
            win_score: WIN_SCORE,
            game_time_secs: GAME_TIME_SECS,
            clock_period_ms: CLOCK_PERIOD_MS,
            spawn_period_ms: SPAWN_PERIOD_MS,
            spawn_angle_deg: SPAWN_ANGLE_DEG,
            travel_distance: TRAVEL_DISTANCE,
            round_end_delay_ms: ROUND_END_DELAY_MS,
            banner_duration_ms: BANNER_DURATION_MS,
            decoy_policy: DecoyPolicy::Penalty,
            audio: AudioConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the round core relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vocabulary.is_empty() {
            return Err(ConfigError::EmptyVocabulary);
        }
        if !self.vocabulary.contains(&self.correct_word) {
            return Err(ConfigError::CorrectWordMissing(self.correct_word.clone()));
        }
        if self.win_score == 0 {
            return Err(ConfigError::ZeroWinScore);
        }
        if self.game_time_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        for (name, value) in [
            ("clock_period_ms", self.clock_period_ms),
            ("spawn_period_ms", self.spawn_period_ms),
            ("round_end_delay_ms", self.round_end_delay_ms),
            ("banner_duration_ms", self.banner_duration_ms),
            ("resume_timeout_ms", self.audio.retry.resume_timeout_ms),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::BadPeriod { name, value });
            }
        }
        if !(0.0..=90.0).contains(&self.spawn_angle_deg) {
            return Err(ConfigError::AngleOutOfRange(self.spawn_angle_deg));
        }
        if !self.travel_distance.is_finite() || self.travel_distance <= 0.0 {
            return Err(ConfigError::BadDistance(self.travel_distance));
        }
        if !(0.0..=1.0).contains(&self.audio.gain) {
            return Err(ConfigError::GainOutOfRange(self.audio.gain));
        }
        if self.audio.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroRetryBudget);
        }
        Ok(())
    }

    /// Whether `word` is the target word
    pub fn is_correct(&self, word: &str) -> bool {
        word == self.correct_word
    }

    /// Progress indicator text for the current score
    pub fn progress_text(&self, score: u32) -> String {
        if score >= self.win_score {
            "やったね⚡️".to_string()
        } else {
            format!("{}を{}つ集めろ⚡️", self.correct_word, self.win_score - score)
        }
    }

    /// Environment variable naming an optional JSON config file
    const CONFIG_ENV: &'static str = "BARIBARI_CONFIG";
    /// Environment variable overriding the decoy policy (`penalty`/`on`, `ignore`/`off`)
    const DECOY_ENV: &'static str = "BARIBARI_DECOY";

    /// Apply single-value overrides on top of a loaded config
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let Some(value) = lookup(Self::DECOY_ENV) else {
            return;
        };
        match DecoyPolicy::from_str(&value) {
            Some(policy) => {
                log::info!("Decoy policy overridden: {}", policy.as_str());
                self.decoy_policy = policy;
            }
            None => log::warn!("Ignoring {}='{}'", Self::DECOY_ENV, value),
        }
    }

    /// Load config from the file named by `BARIBARI_CONFIG`, or use defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default() -> Self {
        let mut config = Self::load_file();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load_file() -> Self {
        let Ok(path) = std::env::var(Self::CONFIG_ENV) else {
            log::info!("Using default game config");
            return Self::default();
        };

        match std::fs::read_to_string(&path)
            .map_err(ConfigError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(config) => {
                log::info!("Loaded game config from {}", path);
                config
            }
            Err(e) => {
                log::warn!("Ignoring config '{}': {}", path, e);
                Self::default()
            }
        }
    }

    /// Web builds ship with the built-in config
    #[cfg(target_arch = "wasm32")]
    pub fn load_or_default() -> Self {
        log::debug!("{} is not read on the web", Self::CONFIG_ENV);
        Self::default()
    }
}
