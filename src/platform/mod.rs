//! Platform abstraction layer
//!
//! Implementations of the rendering surface and audio backend seams:
//! - `web`: DOM handles and the Web Audio API (wasm32 only)
//! - `headless`: recording surface and scripted audio, used natively and in tests

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;
