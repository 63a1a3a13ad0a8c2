//! Configuration for the glitch engine and its audio host
//!
//! Persisted as YAML:
//!
//! ```yaml
//! engine:
//!   buffer_seconds: 4.0
//!   beat_seconds: 0.5
//! audio:
//!   input_device: null
//!   output_device: null
//!   buffer_size: Default
//!   sample_rate: null
//! ```
//!
//! Every field has a default, so partial files are fine.

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, CONFIG_FILENAME};

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::error::{GlitchError, GlitchResult};

/// Seconds of history the ring buffer keeps
pub const DEFAULT_BUFFER_SECONDS: f32 = 4.0;

/// One beat at 120 BPM
pub const DEFAULT_BEAT_SECONDS: f32 = 0.5;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    pub engine: EngineConfig,
    pub audio: AudioConfig,
}

/// Engine geometry, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ring buffer length in seconds
    pub buffer_seconds: f32,
    /// Reference beat length in seconds (scales stutter and gate periods)
    pub beat_seconds: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            beat_seconds: DEFAULT_BEAT_SECONDS,
        }
    }
}

/// Frame counts derived from an [`EngineConfig`] at a given sample rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineGeometry {
    /// Ring capacity in frames
    pub capacity: usize,
    /// Beat length in frames
    pub beat_len: f64,
}

impl EngineConfig {
    /// Validate the config and convert it to frame counts
    ///
    /// The buffer must hold at least two beats: that is the longest window
    /// any trajectory reads (the tape stop runs over two beats).
    pub fn geometry(&self, sample_rate: u32) -> GlitchResult<EngineGeometry> {
        if sample_rate == 0 {
            return Err(GlitchError::InvalidSampleRate(sample_rate));
        }
        if !self.buffer_seconds.is_finite() || self.buffer_seconds <= 0.0 {
            return Err(GlitchError::InvalidConfig(format!(
                "buffer_seconds must be positive, got {}",
                self.buffer_seconds
            )));
        }
        if !self.beat_seconds.is_finite() || self.beat_seconds <= 0.0 {
            return Err(GlitchError::InvalidConfig(format!(
                "beat_seconds must be positive, got {}",
                self.beat_seconds
            )));
        }

        let capacity = (sample_rate as f64 * self.buffer_seconds as f64) as usize;
        let beat_len = sample_rate as f64 * self.beat_seconds as f64;

        if (capacity as f64) < beat_len * 2.0 {
            return Err(GlitchError::InvalidConfig(format!(
                "buffer of {}s cannot hold two beats of {}s",
                self.buffer_seconds, self.beat_seconds
            )));
        }

        Ok(EngineGeometry { capacity, beat_len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_at_44k() {
        let geometry = EngineConfig::default().geometry(44100).unwrap();
        assert_eq!(geometry.capacity, 176_400);
        assert_eq!(geometry.beat_len, 22_050.0);
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        assert!(matches!(
            EngineConfig::default().geometry(0),
            Err(GlitchError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_rejects_non_positive_lengths() {
        let config = EngineConfig {
            buffer_seconds: 0.0,
            ..Default::default()
        };
        assert!(config.geometry(48000).is_err());

        let config = EngineConfig {
            beat_seconds: f32::NAN,
            ..Default::default()
        };
        assert!(config.geometry(48000).is_err());
    }

    #[test]
    fn test_rejects_buffer_shorter_than_two_beats() {
        let config = EngineConfig {
            buffer_seconds: 0.9,
            beat_seconds: 0.5,
        };
        assert!(matches!(
            config.geometry(48000),
            Err(GlitchError::InvalidConfig(_))
        ));
    }
}
