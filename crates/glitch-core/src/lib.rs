//! Glitch Core - real-time time-manipulation engine
//!
//! A continuously recording stereo ring buffer with twelve momentary
//! playback modes (stutters, reverse, tape stop, backspin, gate, shuffle),
//! plus a live CPAL host and an offline WAV renderer.

pub mod audio;
pub mod config;
pub mod error;
pub mod glitch;
pub mod render;
pub mod types;

pub use error::{GlitchError, GlitchResult};
pub use glitch::{GlitchEngine, GlitchMode, GlitchState, ModeHandle};
pub use types::*;
