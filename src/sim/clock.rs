//! Round countdown
//!
//! Single source of truth for `time_left`. Ticks once per period and signals
//! expiry exactly once, then stops itself.

use super::state::GameState;
use super::timer::{TimerId, TimerKind, TimerQueue};

/// Outcome of one clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// Countdown moved; new value
    Ticked(u32),
    /// Countdown hit zero (terminal)
    Expired,
    /// Stray tick on an inactive round or stopped clock; nothing changed
    Idle,
}

/// Pure countdown step
pub fn countdown(state: GameState) -> (GameState, ClockSignal) {
    if !state.active || state.time_left == 0 {
        return (state, ClockSignal::Idle);
    }

    let time_left = state.time_left - 1;
    let next = GameState { time_left, ..state };
    if time_left == 0 {
        (next, ClockSignal::Expired)
    } else {
        (next, ClockSignal::Ticked(time_left))
    }
}

/// Repeating countdown timer
#[derive(Debug, Clone)]
pub struct Clock {
    period_ms: f64,
    timer: Option<TimerId>,
}

impl Clock {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            timer: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Begin ticking (restarts if already running)
    pub fn start(&mut self, timers: &mut TimerQueue) {
        self.stop(timers);
        self.timer = Some(timers.set_interval(self.period_ms, TimerKind::ClockTick));
    }

    /// Cancel the repeating tick. Safe to call when not running.
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
    }

    /// Handle a fired tick
    pub fn on_tick(
        &mut self,
        state: GameState,
        timers: &mut TimerQueue,
    ) -> (GameState, ClockSignal) {
        if !self.is_running() {
            return (state, ClockSignal::Idle);
        }

        let (state, signal) = countdown(state);
        if signal == ClockSignal::Expired {
            self.stop(timers);
        }
        (state, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_expires_after_exactly_game_time_ticks() {
        let config = GameConfig::default();
        let mut timers = TimerQueue::new();
        let mut clock = Clock::new(config.clock_period_ms);
        let mut state = GameState::begin(&config);
        clock.start(&mut timers);

        let mut expired = 0;
        let mut ticks = 0;
        while let Some(fired) = timers.pop_due(60_000.0) {
            assert_eq!(fired.kind, TimerKind::ClockTick);
            ticks += 1;
            let (next, signal) = clock.on_tick(state, &mut timers);
            state = next;
            if signal == ClockSignal::Expired {
                expired += 1;
            }
        }

        assert_eq!(ticks, 20);
        assert_eq!(expired, 1);
        assert_eq!(state.time_left(), 0);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_countdown_ignores_inactive_state() {
        let config = GameConfig::default();
        let idle = GameState::idle(&config);
        let (next, signal) = countdown(idle);
        assert_eq!(signal, ClockSignal::Idle);
        assert_eq!(next, idle);
    }

    #[test]
    fn test_countdown_never_underflows() {
        let config = GameConfig::default();
        let state = GameState {
            time_left: 0,
            ..GameState::begin(&config)
        };
        let (next, signal) = countdown(state);
        assert_eq!(signal, ClockSignal::Idle);
        assert_eq!(next.time_left(), 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_silences_ticks() {
        let config = GameConfig::default();
        let mut timers = TimerQueue::new();
        let mut clock = Clock::new(config.clock_period_ms);
        clock.stop(&mut timers);
        clock.start(&mut timers);
        clock.stop(&mut timers);
        clock.stop(&mut timers);
        assert!(timers.is_empty());

        let state = GameState::begin(&config);
        let (next, signal) = clock.on_tick(state, &mut timers);
        assert_eq!(signal, ClockSignal::Idle);
        assert_eq!(next, state);
    }
}
