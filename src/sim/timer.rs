//! Deterministic timer queue
//!
//! Every timer in the game (countdown, spawner, round-end delay, banner hide,
//! audio retries) lives here. The platform loop calls [`TimerQueue::pop_due`]
//! with the current time; timers fire one at a time in due order so a callback
//! can cancel anything scheduled after it.

use crate::audio::PlayRequest;

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, PartialEq)]
pub enum TimerKind {
    /// Countdown decrement
    ClockTick,
    /// Spawn one word
    SpawnTick,
    /// Round-end banner has been shown long enough
    RoundEndDelay,
    /// Hide the message banner
    BannerHide,
    /// Retry a voice playback
    AudioRetry(PlayRequest),
    /// Give up waiting on an output context resume
    ResumeTimeout(PlayRequest),
}

/// A timer that has come due
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub id: TimerId,
    pub kind: TimerKind,
    /// Scheduled fire time (ms)
    pub at_ms: f64,
}

#[derive(Debug, Clone)]
struct Entry {
    id: TimerId,
    kind: TimerKind,
    due_ms: f64,
    period_ms: Option<f64>,
}

/// Millisecond timer queue with interval and one-shot timers
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now_ms: f64,
    next_id: u64,
    entries: Vec<Entry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current queue time (last fired timer or last `advance_to`)
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn allocate_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Schedule `kind` to fire every `period_ms`, first after one period
    pub fn set_interval(&mut self, period_ms: f64, kind: TimerKind) -> TimerId {
        let id = self.allocate_id();
        self.entries.push(Entry {
            id,
            kind,
            due_ms: self.now_ms + period_ms,
            period_ms: Some(period_ms),
        });
        id
    }

    /// Schedule `kind` to fire once after `delay_ms`
    pub fn set_timeout(&mut self, delay_ms: f64, kind: TimerKind) -> TimerId {
        let id = self.allocate_id();
        self.entries.push(Entry {
            id,
            kind,
            due_ms: self.now_ms + delay_ms.max(0.0),
            period_ms: None,
        });
        id
    }

    /// Cancel a timer. Returns false if it was not scheduled (already fired or cancelled).
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Whether a timer is still scheduled
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Number of scheduled timers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop the earliest timer due at or before `until_ms`.
    ///
    /// Ties fire in scheduling order. Intervals are re-armed one period later.
    pub fn pop_due(&mut self, until_ms: f64) -> Option<Fired> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_ms <= until_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.0.cmp(&b.id.0))
            })
            .map(|(i, _)| i)?;

        let fired = Fired {
            id: self.entries[index].id,
            kind: self.entries[index].kind.clone(),
            at_ms: self.entries[index].due_ms,
        };
        self.now_ms = self.now_ms.max(fired.at_ms);

        match self.entries[index].period_ms {
            Some(period) => self.entries[index].due_ms += period,
            None => {
                self.entries.swap_remove(index);
            }
        }

        Some(fired)
    }

    /// Move the clock forward without firing anything (call after draining `pop_due`)
    pub fn advance_to(&mut self, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}
