//! Headless platform
//!
//! `HeadlessSurface` records what the core writes instead of drawing it, and
//! `HeadlessAudio` completes audio operations on the next pump with scriptable
//! failures. The native demo and the test suite both run on these.

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::audio::{AudioBackend, AudioError, AudioEvent, ContextStatus, PlayRequest, SourceId};
use crate::sim::{Control, Handle, SpawnToken, Surface, SurfaceError};

/// Surface that keeps every write in memory
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    texts: HashMap<Handle, String>,
    visible: HashMap<Handle, bool>,
    tokens: Vec<SpawnToken>,
    emitted: usize,
    listeners: HashMap<Control, u32>,
    bind_calls: HashMap<Control, u32>,
    missing: HashSet<Handle>,
    origin: Vec2,
    playing: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            origin: Vec2::new(0.0, 400.0),
            ..Default::default()
        }
    }

    /// Pretend `handle` is absent from the page
    pub fn without(mut self, handle: Handle) -> Self {
        self.missing.insert(handle);
        self
    }

    fn check(&self, handle: Handle) -> Result<(), SurfaceError> {
        if self.missing.contains(&handle) {
            Err(SurfaceError::MissingHandle(handle))
        } else {
            Ok(())
        }
    }

    pub fn text(&self, handle: Handle) -> Option<&str> {
        self.texts.get(&handle).map(String::as_str)
    }

    pub fn is_visible(&self, handle: Handle) -> bool {
        self.visible.get(&handle).copied().unwrap_or(false)
    }

    /// Tokens still on screen
    pub fn tokens(&self) -> &[SpawnToken] {
        &self.tokens
    }

    /// Total tokens ever emitted
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Listeners currently attached to `control`
    pub fn listeners(&self, control: Control) -> u32 {
        self.listeners.get(&control).copied().unwrap_or(0)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn bind_calls(&self, control: Control) -> u32 {
        self.bind_calls.get(&control).copied().unwrap_or(0)
    }

    /// Let a token fly off the play area
    pub fn expire(&mut self, id: u32) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t.id != id);
        self.tokens.len() != before
    }
}

impl Surface for HeadlessSurface {
    fn set_text(&mut self, handle: Handle, text: &str) -> Result<(), SurfaceError> {
        self.check(handle)?;
        self.texts.insert(handle, text.to_string());
        Ok(())
    }

    fn set_visible(&mut self, handle: Handle, visible: bool) -> Result<(), SurfaceError> {
        self.check(handle)?;
        self.visible.insert(handle, visible);
        Ok(())
    }

    fn origin(&self) -> Result<Vec2, SurfaceError> {
        self.check(Handle::Origin)?;
        Ok(self.origin)
    }

    fn emit_token(&mut self, token: &SpawnToken) -> Result<(), SurfaceError> {
        self.check(Handle::PlayArea)?;
        self.tokens.push(token.clone());
        self.emitted += 1;
        Ok(())
    }

    fn retire_token(&mut self, id: u32, _linger: bool) {
        self.expire(id);
    }

    fn clear_tokens(&mut self) -> Result<(), SurfaceError> {
        self.check(Handle::PlayArea)?;
        self.tokens.clear();
        Ok(())
    }

    fn bind_control(&mut self, control: Control) -> Result<(), SurfaceError> {
        *self.bind_calls.entry(control).or_default() += 1;
        // Replace, never stack
        self.listeners.insert(control, 1);
        Ok(())
    }

    fn set_playing(&mut self, playing: bool) -> Result<(), SurfaceError> {
        self.playing = playing;
        Ok(())
    }
}

/// Decoded clip stand-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessBuffer {
    pub key: String,
}

/// Audio backend whose operations complete on the next drain
#[derive(Debug, Default)]
pub struct HeadlessAudio {
    context: Option<ContextStatus>,
    pub gain: Option<f32>,
    pub fail_create: bool,
    pub start_suspended: bool,
    /// Resumes that will still fail
    pub resume_failures: u32,
    /// Resumes that will never settle
    pub hanging_resumes: u32,
    /// Source starts that will still fail
    pub start_failures: u32,
    /// Keys whose asset fails to load
    pub missing_assets: HashSet<String>,
    pub create_calls: u32,
    pub resume_calls: u32,
    pub load_calls: Vec<String>,
    pub played: Vec<String>,
    next_source: u64,
    events: Vec<AudioEvent<HeadlessBuffer>>,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn starting_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    pub fn with_resume_failures(mut self, count: u32) -> Self {
        self.resume_failures = count;
        self
    }

    pub fn with_hanging_resumes(mut self, count: u32) -> Self {
        self.hanging_resumes = count;
        self
    }

    pub fn with_start_failures(mut self, count: u32) -> Self {
        self.start_failures = count;
        self
    }

    pub fn with_missing_asset(mut self, key: &str) -> Self {
        self.missing_assets.insert(key.to_string());
        self
    }

    /// Simulate the platform suspending output (power saving)
    pub fn suspend(&mut self) {
        if self.context.is_some() {
            self.context = Some(ContextStatus::Suspended);
        }
    }
}

impl AudioBackend for HeadlessAudio {
    type Buffer = HeadlessBuffer;

    fn create_context(&mut self, gain: f32) -> Result<(), AudioError> {
        self.create_calls += 1;
        if self.fail_create {
            return Err(AudioError::Unavailable("headless output disabled".to_string()));
        }
        self.context = Some(if self.start_suspended {
            ContextStatus::Suspended
        } else {
            ContextStatus::Running
        });
        self.gain = Some(gain);
        Ok(())
    }

    fn context_status(&self) -> Option<ContextStatus> {
        self.context
    }

    fn request_resume(&mut self, request: PlayRequest) {
        self.resume_calls += 1;
        if self.hanging_resumes > 0 {
            self.hanging_resumes -= 1;
            return;
        }
        let result = if self.resume_failures > 0 {
            self.resume_failures -= 1;
            Err(AudioError::Resume("not allowed".to_string()))
        } else {
            self.context = Some(ContextStatus::Running);
            Ok(())
        };
        self.events.push(AudioEvent::Resumed { request, result });
    }

    fn request_load(&mut self, key: &str, asset: &str) {
        self.load_calls.push(key.to_string());
        let result = if self.context.is_none() {
            Err(AudioError::NoContext)
        } else if self.missing_assets.contains(key) {
            Err(AudioError::Fetch {
                asset: asset.to_string(),
                reason: "HTTP 404".to_string(),
            })
        } else {
            Ok(HeadlessBuffer {
                key: key.to_string(),
            })
        };
        self.events.push(AudioEvent::Loaded {
            key: key.to_string(),
            result,
        });
    }

    fn start_source(
        &mut self,
        buffer: &HeadlessBuffer,
        _request: &PlayRequest,
    ) -> Result<SourceId, AudioError> {
        if self.start_failures > 0 {
            self.start_failures -= 1;
            return Err(AudioError::Playback("source refused to start".to_string()));
        }
        self.next_source += 1;
        let source = SourceId(self.next_source);
        self.played.push(buffer.key.clone());
        self.events.push(AudioEvent::PlaybackEnded { source });
        Ok(source)
    }

    fn drain_events(&mut self) -> Vec<AudioEvent<HeadlessBuffer>> {
        std::mem::take(&mut self.events)
    }
}
