//! Glitch engine error types
//!
//! The per-frame path has no failure modes; errors only come from engine
//! construction, configuration and the offline renderer's file I/O.

use thiserror::Error;

use crate::glitch::UnknownMode;

/// Errors that can occur when building an engine or rendering offline
#[derive(Error, Debug)]
pub enum GlitchError {
    /// Sample rate of zero
    #[error("Invalid sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    /// Engine configuration rejected
    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),

    /// Schedule entry could not be parsed
    #[error("Invalid schedule entry '{entry}': {reason}")]
    InvalidSchedule { entry: String, reason: String },

    /// Unknown mode name or id
    #[error(transparent)]
    UnknownMode(#[from] UnknownMode),

    /// WAV decoding/encoding failure
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Input file has no usable channels
    #[error("Unsupported WAV layout: {0}")]
    UnsupportedWav(String),
}

/// Result type for glitch operations
pub type GlitchResult<T> = Result<T, GlitchError>;
