//! Rendering surface seam
//!
//! The core never builds layout. It toggles visibility and text on a fixed set
//! of handles, hands token descriptors over for animation, and asks for control
//! listeners to be (re)bound.

use glam::Vec2;
use thiserror::Error;

use super::state::SpawnToken;

/// Interface elements the core writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// Container tokens are appended to
    PlayArea,
    /// Element tokens burst out of
    Origin,
    /// "collect N more" indicator
    Progress,
    Countdown,
    /// Win/lose message
    Banner,
    StartScreen,
    PlayScreen,
    ClearScreen,
    /// Title artwork, shown with the start screen only
    Cover,
}

/// Interactive controls the core owns the listeners of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Start,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("interface handle {0:?} is missing")]
    MissingHandle(Handle),
    #[error("control {0:?} is missing")]
    MissingControl(Control),
    #[error("surface operation failed: {0}")]
    Dom(String),
}

/// Narrow handle interface onto the rendering surface
pub trait Surface {
    fn set_text(&mut self, handle: Handle, text: &str) -> Result<(), SurfaceError>;

    fn set_visible(&mut self, handle: Handle, visible: bool) -> Result<(), SurfaceError>;

    /// Spawn point for new tokens
    fn origin(&self) -> Result<Vec2, SurfaceError>;

    /// Animate a new token; the surface reports selection or expiry back by id
    fn emit_token(&mut self, token: &SpawnToken) -> Result<(), SurfaceError>;

    /// Take a token out of interaction. With `linger` it stays visible briefly
    /// as wrong-answer feedback before it is removed.
    fn retire_token(&mut self, id: u32, linger: bool);

    /// Remove every in-flight token
    fn clear_tokens(&mut self) -> Result<(), SurfaceError>;

    /// Attach the listener for `control`, replacing any listener bound earlier
    fn bind_control(&mut self, control: Control) -> Result<(), SurfaceError>;

    /// Page-wide play mode (scroll and zoom locked while a round runs)
    fn set_playing(&mut self, playing: bool) -> Result<(), SurfaceError>;
}
