//! Voice feedback
//!
//! Plays the voice clip of every resolved word. Browsers refuse audio output
//! before a user gesture and may suspend the output context at any time, so
//! every path (initialize, resume, reload, playback) runs under one bounded
//! retry budget. Audio never touches score or round state.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AudioConfig;
use crate::consts::{MAX_PLAY_ATTEMPTS, RESUME_TIMEOUT_MS, RETRY_SETTLE_MS, RETRY_STEP_MS};
use crate::sim::timer::{TimerId, TimerKind, TimerQueue};

/// User interactions that unlock audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    PointerDown,
    PointerUp,
    PrimaryAction,
}

/// Output context state as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    Running,
    /// Power saving or autoplay policy; needs a resume
    Suspended,
    Closed,
}

/// Initialization lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPhase {
    Uninitialized,
    /// Context exists, preload in flight
    Initializing,
    /// Every preload has settled (successfully or not)
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("audio context not initialized")]
    NoContext,
    #[error("failed to fetch {asset}: {reason}")]
    Fetch { asset: String, reason: String },
    #[error("failed to decode {asset}: {reason}")]
    Decode { asset: String, reason: String },
    #[error("failed to resume audio context: {0}")]
    Resume(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

/// One-shot source handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// A playback attempt in flight
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayRequest {
    /// Distinguishes concurrent playbacks of the same key
    pub playback: u64,
    pub key: String,
    /// 1-based attempt number
    pub attempt: u32,
    /// Reload of the key's asset already triggered for this playback
    pub reload_requested: bool,
}

impl PlayRequest {
    pub fn new(playback: u64, key: &str) -> Self {
        Self {
            playback,
            key: key.to_string(),
            attempt: 1,
            reload_requested: false,
        }
    }

    /// Same playback, next attempt
    pub fn next(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

/// Delay before retrying after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Backoff {
    /// `attempt * step_ms`
    Linear { step_ms: f64 },
    Fixed { delay_ms: f64 },
}

impl Backoff {
    pub fn delay_ms(&self, attempt: u32) -> f64 {
        match *self {
            Backoff::Linear { step_ms } => step_ms * attempt as f64,
            Backoff::Fixed { delay_ms } => delay_ms,
        }
    }
}

/// Shared retry budget for a single playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Fixed wait after (re)initialization or a reload before trying again
    pub settle_ms: f64,
    /// A resume that has not settled by then counts as failed
    pub resume_timeout_ms: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_PLAY_ATTEMPTS,
            backoff: Backoff::Linear {
                step_ms: RETRY_STEP_MS,
            },
            settle_ms: RETRY_SETTLE_MS,
            resume_timeout_ms: RESUME_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

/// Completions reported asynchronously by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent<B> {
    Loaded {
        key: String,
        result: Result<B, AudioError>,
    },
    Resumed {
        request: PlayRequest,
        result: Result<(), AudioError>,
    },
    PlaybackEnded {
        source: SourceId,
    },
}

/// Platform audio output
///
/// Long-running operations (resume, load) complete later through
/// [`AudioBackend::drain_events`].
pub trait AudioBackend {
    type Buffer: Clone;

    /// Create the output context and its fixed-gain stage
    fn create_context(&mut self, gain: f32) -> Result<(), AudioError>;

    /// `None` when no context exists yet
    fn context_status(&self) -> Option<ContextStatus>;

    fn request_resume(&mut self, request: PlayRequest);

    /// Fetch and decode one asset
    fn request_load(&mut self, key: &str, asset: &str);

    /// Start a fresh one-shot source through the gain stage. A source that
    /// fails to start is released before the error is returned.
    fn start_source(
        &mut self,
        buffer: &Self::Buffer,
        request: &PlayRequest,
    ) -> Result<SourceId, AudioError>;

    fn drain_events(&mut self) -> Vec<AudioEvent<Self::Buffer>>;
}

/// Decoded clips by word; write-once, never evicted
#[derive(Debug, Clone)]
pub struct AudioBufferCache<B> {
    buffers: HashMap<String, B>,
}

impl<B> Default for AudioBufferCache<B> {
    fn default() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }
}

impl<B> AudioBufferCache<B> {
    /// Insert unless present. Returns false if the key was already cached.
    pub fn insert(&mut self, key: &str, buffer: B) -> bool {
        if self.buffers.contains_key(key) {
            return false;
        }
        self.buffers.insert(key.to_string(), buffer);
        true
    }

    pub fn get(&self, key: &str) -> Option<&B> {
        self.buffers.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.buffers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    pub attempts: u32,
    pub started: u32,
    pub abandoned: u32,
    pub resumes: u32,
    pub reloads: u32,
}

/// Lazily-initialized voice feedback
pub struct AudioFeedback<A: AudioBackend> {
    backend: A,
    phase: AudioPhase,
    cache: AudioBufferCache<A::Buffer>,
    config: AudioConfig,
    /// Keys with a load in flight
    loading: HashSet<String>,
    /// Playbacks parked until their key's reload settles
    waiting: HashMap<String, Vec<PlayRequest>>,
    /// Resumes in flight and their timeout timers
    resuming: HashMap<PlayRequest, TimerId>,
    live_sources: HashSet<SourceId>,
    next_playback: u64,
    stats: AudioStats,
}

impl<A: AudioBackend> AudioFeedback<A> {
    pub fn new(backend: A, config: &AudioConfig) -> Self {
        Self {
            backend,
            phase: AudioPhase::Uninitialized,
            cache: AudioBufferCache::default(),
            config: config.clone(),
            loading: HashSet::new(),
            waiting: HashMap::new(),
            resuming: HashMap::new(),
            live_sources: HashSet::new(),
            next_playback: 0,
            stats: AudioStats::default(),
        }
    }

    pub fn phase(&self) -> AudioPhase {
        self.phase
    }

    pub fn stats(&self) -> AudioStats {
        self.stats
    }

    pub fn cache(&self) -> &AudioBufferCache<A::Buffer> {
        &self.cache
    }

    /// Sources started and not yet ended
    pub fn live_sources(&self) -> usize {
        self.live_sources.len()
    }

    pub fn backend(&self) -> &A {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut A {
        &mut self.backend
    }

    /// Any user interaction; the first one initializes audio
    pub fn on_gesture(&mut self, gesture: Gesture) {
        if self.phase == AudioPhase::Uninitialized {
            log::info!("First user interaction detected ({:?})", gesture);
        }
        self.initialize();
    }

    /// Create the output context and preload every clip. Repeated calls collapse.
    pub fn initialize(&mut self) {
        if self.phase != AudioPhase::Uninitialized {
            return;
        }

        if self.backend.context_status().is_none() {
            if let Err(e) = self.backend.create_context(self.config.gain) {
                log::error!("Failed to initialize audio: {}", e);
                return;
            }
            log::info!("AudioContext initialized");
        }

        self.phase = AudioPhase::Initializing;
        self.preload();
    }

    fn preload(&mut self) {
        log::info!("Starting to preload audio files...");
        for (key, asset) in &self.config.assets {
            if self.cache.contains(key) || self.loading.contains(key) {
                continue;
            }
            log::debug!("Loading: {}", asset);
            self.loading.insert(key.clone());
            self.backend.request_load(key, asset);
        }
        self.check_ready();
    }

    fn check_ready(&mut self) {
        if self.phase == AudioPhase::Initializing && self.loading.is_empty() {
            self.phase = AudioPhase::Ready;
            log::info!(
                "Audio preload settled ({}/{} clips decoded)",
                self.cache.len(),
                self.config.assets.len()
            );
        }
    }

    /// Play the clip for `key` (best effort)
    pub fn play(&mut self, key: &str, timers: &mut TimerQueue) {
        self.next_playback += 1;
        self.attempt(PlayRequest::new(self.next_playback, key), timers);
    }

    /// Continue a playback whose retry timer fired
    pub fn retry(&mut self, request: PlayRequest, timers: &mut TimerQueue) {
        self.attempt(request, timers);
    }

    fn attempt(&mut self, request: PlayRequest, timers: &mut TimerQueue) {
        if !self.config.retry.allows(request.attempt) {
            self.abandon(&request);
            return;
        }
        self.stats.attempts += 1;

        match self.backend.context_status() {
            None => {
                log::warn!("AudioContext not initialized, trying to initialize...");
                self.phase = AudioPhase::Uninitialized;
                self.initialize();
                self.schedule(request.next(), self.config.retry.settle_ms, timers);
                return;
            }
            Some(ContextStatus::Suspended) => {
                log::info!("AudioContext is suspended, attempting to resume...");
                self.stats.resumes += 1;
                let timeout = timers.set_timeout(
                    self.config.retry.resume_timeout_ms,
                    TimerKind::ResumeTimeout(request.clone()),
                );
                self.resuming.insert(request.clone(), timeout);
                self.backend.request_resume(request);
                return;
            }
            Some(ContextStatus::Closed) => {
                log::warn!("AudioContext is closed");
                self.schedule_backoff(&request, timers);
                return;
            }
            Some(ContextStatus::Running) => {}
        }

        let Some(buffer) = self.cache.get(&request.key) else {
            self.on_missing_buffer(request, timers);
            return;
        };

        match self.backend.start_source(buffer, &request) {
            Ok(source) => {
                log::debug!("Starting playback: {}", request.key);
                self.live_sources.insert(source);
                self.stats.started += 1;
            }
            Err(e) => {
                log::error!("Error playing sound {}: {}", request.key, e);
                self.schedule_backoff(&request, timers);
            }
        }
    }

    fn on_missing_buffer(&mut self, mut request: PlayRequest, timers: &mut TimerQueue) {
        log::warn!("Audio buffer not loaded: {}", request.key);

        if request.reload_requested {
            self.schedule_backoff(&request, timers);
            return;
        }
        let Some(asset) = self.config.asset_for(&request.key) else {
            log::warn!("No audio asset configured for {}", request.key);
            self.schedule_backoff(&request, timers);
            return;
        };

        // A preload already in flight serves as the reload
        request.reload_requested = true;
        if self.loading.insert(request.key.clone()) {
            log::info!("Attempting to reload {}", asset);
            self.stats.reloads += 1;
            self.backend.request_load(&request.key, asset);
        }
        self.waiting
            .entry(request.key.clone())
            .or_default()
            .push(request);
    }

    fn schedule_backoff(&mut self, failed: &PlayRequest, timers: &mut TimerQueue) {
        let delay = self.config.retry.backoff.delay_ms(failed.attempt);
        self.schedule(failed.next(), delay, timers);
    }

    fn schedule(&mut self, request: PlayRequest, delay_ms: f64, timers: &mut TimerQueue) {
        if !self.config.retry.allows(request.attempt) {
            self.abandon(&request);
            return;
        }
        log::debug!(
            "Retrying playback of {} ({}/{}) in {}ms",
            request.key,
            request.attempt,
            self.config.retry.max_attempts,
            delay_ms
        );
        timers.set_timeout(delay_ms, TimerKind::AudioRetry(request));
    }

    fn abandon(&mut self, request: &PlayRequest) {
        self.stats.abandoned += 1;
        log::warn!(
            "Max play attempts ({}) reached for sound: {}",
            self.config.retry.max_attempts,
            request.key
        );
    }

    /// A resume did not settle in time; spend an attempt and back off
    pub fn resume_timed_out(&mut self, request: PlayRequest, timers: &mut TimerQueue) {
        if self.resuming.remove(&request).is_none() {
            return;
        }
        log::warn!("Resuming AudioContext timed out for {}", request.key);
        self.schedule_backoff(&request, timers);
    }

    /// Apply every completion the backend has reported
    pub fn pump(&mut self, timers: &mut TimerQueue) {
        loop {
            let events = self.backend.drain_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.handle_event(event, timers);
            }
        }
    }

    fn handle_event(&mut self, event: AudioEvent<A::Buffer>, timers: &mut TimerQueue) {
        match event {
            AudioEvent::Loaded { key, result } => {
                self.loading.remove(&key);
                match result {
                    Ok(buffer) => {
                        if self.cache.insert(&key, buffer) {
                            log::info!("Successfully loaded: {}", key);
                        }
                    }
                    Err(e) => log::error!("Error loading {}: {}", key, e),
                }
                for request in self.waiting.remove(&key).unwrap_or_default() {
                    self.schedule(request.next(), self.config.retry.settle_ms, timers);
                }
                self.check_ready();
            }
            AudioEvent::Resumed { request, result } => {
                let Some(timeout) = self.resuming.remove(&request) else {
                    log::debug!("Late resume for {} ignored", request.key);
                    return;
                };
                timers.cancel(timeout);
                self.on_resumed(request, result, timers);
            }
            AudioEvent::PlaybackEnded { source } => {
                self.live_sources.remove(&source);
                log::debug!("Playback finished: {:?}", source);
            }
        }
    }

    fn on_resumed(
        &mut self,
        request: PlayRequest,
        result: Result<(), AudioError>,
        timers: &mut TimerQueue,
    ) {
        match result {
            Ok(()) => {
                log::info!("AudioContext resumed, retrying playback...");
                self.attempt(request.next(), timers);
            }
            Err(e) => {
                log::error!("{}", e);
                self.schedule_backoff(&request, timers);
            }
        }
    }
}
