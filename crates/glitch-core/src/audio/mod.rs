//! Live audio host for the glitch engine
//!
//! Captures from an input device, runs every frame through a
//! [`GlitchEngine`](crate::glitch::GlitchEngine) and plays the result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                      ┌─────────────────────┐
//! │  Capture Stream  │───push()────────────►│   Capture Queue     │
//! │  (input thread)  │  mono → stereo       │  (lock-free SPSC)   │
//! └──────────────────┘                      └──────────┬──────────┘
//!                                                      │ pop()
//! ┌──────────────────┐                      ┌──────────▼──────────┐
//! │  Control Thread  │───ModeHandle────────►│   Playback Stream   │
//! │  (pads / stdin)  │  relaxed atomics     │ (owns GlitchEngine) │
//! └──────────────────┘◄─────────────────────└─────────────────────┘
//!                        published state
//! ```
//!
//! The playback callback never blocks: missing capture frames play as
//! silence and are counted as underruns.
//!
//! # Example Usage
//!
//! ```ignore
//! use glitch_core::audio::{start_audio_system, AudioConfig};
//! use glitch_core::config::EngineConfig;
//! use glitch_core::GlitchMode;
//!
//! let result = start_audio_system(&AudioConfig::default(), &EngineConfig::default())?;
//! result.mode_handle.press(GlitchMode::Backspin);
//! // ...
//! result.mode_handle.release();
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE,
    LOW_LATENCY_BUFFER_SIZE, MAX_BUFFER_SIZE,
};

pub use cpal_backend::{start_audio_system, AudioHandle, AudioSystemResult};

pub use device::{
    find_device_by_id, get_devices, get_input_devices, get_output_devices, AudioDevice, Direction,
};

pub use error::{AudioError, AudioResult};
