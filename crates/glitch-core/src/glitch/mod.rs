//! Time-manipulation (glitch) engine
//!
//! A stereo ring buffer records without pause while the read head is steered
//! through one of twelve trajectories (stutters, reverse, tape stop,
//! backspin, gate, shuffle). Holding a pad freezes "now" as the anchor of
//! the trajectory; releasing it returns to the live signal.
//!
//! # Architecture
//!
//! ```text
//! ring        fixed-capacity channel storage + wrapping write cursor
//! sampler     fractional reads with linear interpolation
//! trajectory  per-mode (position, gate) as a function of frames since freeze
//! controller  mode state machine + lock-free handoff from the control surface
//! engine      per-frame pipeline tying the above together
//! ```

mod controller;
mod engine;
mod mode;
mod ring;
pub mod sampler;
pub mod trajectory;

pub use controller::{GlitchAtomics, ModeController, ModeHandle};
pub use engine::{GlitchEngine, GlitchState};
pub use mode::{GlitchMode, UnknownMode, NUM_MODES};
pub use ring::RingBuffer;
pub use trajectory::{Cursor, Timing, Trajectory};
