//! Deterministic round core
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Timers only through `TimerQueue`
//! - Seeded RNG only
//! - No DOM or audio dependencies (those sit behind `Surface` / `AudioBackend`)

pub mod clock;
pub mod scene;
pub mod score;
pub mod spawner;
pub mod state;
pub mod surface;
pub mod timer;

pub use clock::{Clock, ClockSignal, countdown};
pub use scene::SceneController;
pub use score::{Resolution, SelectError, resolve};
pub use spawner::{Spawner, make_token};
pub use state::{GameEvent, GameState, RoundOutcome, Scene, SpawnToken, Verdict};
pub use surface::{Control, Handle, Surface, SurfaceError};
pub use timer::{Fired, TimerId, TimerKind, TimerQueue};
