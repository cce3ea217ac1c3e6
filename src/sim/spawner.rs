//! Word spawner
//!
//! Emits one token per period while the round is active. Word choice and
//! motion come from the injected RNG only, so a seed reproduces a round.

use glam::Vec2;
use rand::Rng;

use super::state::{GameState, SpawnToken};
use super::timer::{TimerId, TimerKind, TimerQueue};
use crate::config::GameConfig;

/// Pick a word uniformly (independent draws, repeats allowed)
pub fn pick_word<'a, R: Rng>(rng: &mut R, vocabulary: &'a [String]) -> Option<&'a str> {
    if vocabulary.is_empty() {
        return None;
    }
    let index = rng.random_range(0..vocabulary.len());
    Some(vocabulary[index].as_str())
}

/// Draw a spawn angle uniformly from [-range, range] degrees
pub fn pick_angle<R: Rng>(rng: &mut R, range_deg: f32) -> f32 {
    if range_deg <= 0.0 {
        return 0.0;
    }
    rng.random_range(-range_deg..=range_deg)
}

/// Build a token descriptor; pure apart from the RNG draws
pub fn make_token<R: Rng>(
    rng: &mut R,
    config: &GameConfig,
    id: u32,
    origin: Vec2,
    now_ms: f64,
) -> Option<SpawnToken> {
    let text = pick_word(rng, &config.vocabulary)?.to_string();
    let angle_degrees = pick_angle(rng, config.spawn_angle_deg);
    Some(SpawnToken {
        id,
        text,
        origin,
        angle_degrees,
        travel_distance: config.travel_distance,
        created_at_ms: now_ms,
    })
}

/// Periodic token generator
#[derive(Debug, Clone)]
pub struct Spawner {
    period_ms: f64,
    timer: Option<TimerId>,
    next_id: u32,
}

impl Spawner {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            timer: None,
            next_id: 1,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn start(&mut self, timers: &mut TimerQueue) {
        self.stop(timers);
        self.timer = Some(timers.set_interval(self.period_ms, TimerKind::SpawnTick));
    }

    /// Cancel future emissions; already-emitted tokens stay with the surface
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
    }

    /// Handle a fired spawn tick. No-op unless running on an active round.
    pub fn on_tick<R: Rng>(
        &mut self,
        state: &GameState,
        rng: &mut R,
        config: &GameConfig,
        origin: Vec2,
        now_ms: f64,
    ) -> Option<SpawnToken> {
        if !self.is_running() || !state.is_active() {
            return None;
        }

        let token = make_token(rng, config, self.next_id, origin, now_ms)?;
        self.next_id += 1;
        Some(token)
    }
}
