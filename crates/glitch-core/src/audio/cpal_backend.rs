//! CPAL live host
//!
//! Opens a capture stream and a playback stream and runs the glitch engine
//! between them. Neither callback ever blocks on the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::config::{AudioConfig, MAX_BUFFER_SIZE};
use super::device::{resolve_device, supported_configs, Direction};
use super::error::{AudioError, AudioResult};
use crate::config::EngineConfig;
use crate::glitch::{GlitchEngine, ModeHandle};
use crate::types::{StereoBuffer, StereoSample};

/// Keeps the audio streams alive. Drop this to stop audio.
pub struct AudioHandle {
    _input_stream: Stream,
    _output_stream: Stream,
    sample_rate: u32,
    /// Buffer size in frames (as requested from the devices)
    buffer_size: u32,
    /// Output frames that found no captured input and played silence
    underruns: Arc<AtomicU64>,
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Round-trip latency in milliseconds (capture block + queued block + playback block)
    pub fn latency_ms(&self) -> f32 {
        (3 * self.buffer_size) as f32 / self.sample_rate as f32 * 1000.0
    }

    /// Output frames rendered from silence because capture fell behind
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Everything the caller needs once the live host is running
pub struct AudioSystemResult {
    /// Drop to stop audio
    pub handle: AudioHandle,
    /// Lock-free control surface for the engine owned by the output callback
    pub mode_handle: ModeHandle,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub latency_ms: f32,
}

/// Start the live host
///
/// The engine is built for the negotiated sample rate and moved into the
/// output callback. Captured frames travel to it through a lock-free SPSC
/// queue; control reaches it through the returned [`ModeHandle`].
pub fn start_audio_system(
    config: &AudioConfig,
    engine_config: &EngineConfig,
) -> AudioResult<AudioSystemResult> {
    let input_device = resolve_device(config.input_device.as_ref(), Direction::Input)?;
    let output_device = resolve_device(config.output_device.as_ref(), Direction::Output)?;

    log::info!(
        "Input device: {}",
        input_device.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    log::info!(
        "Output device: {}",
        output_device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let output_supported = get_stream_config(&output_device, Direction::Output, config)?;
    let input_supported = get_stream_config(&input_device, Direction::Input, config)?;

    let sample_rate = output_supported.sample_rate().0;
    let input_rate = input_supported.sample_rate().0;
    if input_rate != sample_rate {
        return Err(AudioError::SampleRateMismatch {
            input: input_rate,
            output: sample_rate,
        });
    }

    let buffer_size = config.buffer_size.frames();
    let output_stream_config = StreamConfig {
        channels: output_supported.channels(),
        sample_rate: output_supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };
    let input_stream_config = StreamConfig {
        channels: input_supported.channels(),
        sample_rate: input_supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };

    let engine = GlitchEngine::new(sample_rate, engine_config)?;
    let mode_handle = engine.handle();

    // 4x buffer size absorbs scheduling jitter between the two callbacks.
    // One block of silence is queued up front so playback starts with slack.
    let capacity = (buffer_size as usize) * 4;
    let (mut producer, consumer) = rtrb::RingBuffer::<StereoSample>::new(capacity);
    for _ in 0..buffer_size {
        if producer.push(StereoSample::silence()).is_err() {
            break;
        }
    }
    log::debug!("Capture queue created with capacity {} frames", capacity);

    let underruns = Arc::new(AtomicU64::new(0));
    let state = LiveCallbackState::new(engine, consumer, Arc::clone(&underruns));

    let input_stream = build_input_stream(&input_device, &input_stream_config, producer)?;
    let output_stream = build_output_stream(&output_device, &output_stream_config, state)?;

    input_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;
    output_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;

    let handle = AudioHandle {
        _input_stream: input_stream,
        _output_stream: output_stream,
        sample_rate,
        buffer_size,
        underruns,
    };
    let latency_ms = handle.latency_ms();

    log::info!(
        "Audio streams started: in {} ch / out {} ch, {}Hz, {} frames (~{:.1}ms round trip)",
        input_stream_config.channels,
        output_stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    Ok(AudioSystemResult {
        handle,
        mode_handle,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// State owned exclusively by the output callback
struct LiveCallbackState {
    engine: GlitchEngine,
    input_rx: rtrb::Consumer<StereoSample>,
    /// Pre-allocated work buffer (RT-safe: resized within capacity only)
    buffer: StereoBuffer,
    underruns: Arc<AtomicU64>,
}

impl LiveCallbackState {
    fn new(
        engine: GlitchEngine,
        input_rx: rtrb::Consumer<StereoSample>,
        underruns: Arc<AtomicU64>,
    ) -> Self {
        Self {
            engine,
            input_rx,
            buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
            underruns,
        }
    }

    /// Fill one interleaved output chunk of at most MAX_BUFFER_SIZE frames
    fn process(&mut self, data: &mut [f32], channels: usize) {
        let n_frames = data.len() / channels;
        self.buffer.set_len_from_capacity(n_frames);

        let mut missing = 0u64;
        for sample in self.buffer.iter_mut() {
            *sample = match self.input_rx.pop() {
                Ok(frame) => frame,
                Err(_) => {
                    missing += 1;
                    StereoSample::silence()
                }
            };
        }
        if missing > 0 {
            self.underruns.fetch_add(missing, Ordering::Relaxed);
        }

        self.engine.process_buffer(&mut self.buffer);

        write_interleaved(data, channels, self.buffer.as_slice());
    }
}

/// Copy stereo frames into an interleaved device buffer
///
/// Channels beyond the second get silence; a mono device gets the left channel.
fn write_interleaved(data: &mut [f32], channels: usize, samples: &[StereoSample]) {
    for (i, frame) in data.chunks_mut(channels).enumerate() {
        match samples.get(i) {
            Some(sample) => {
                frame[0] = sample.left;
                if channels > 1 {
                    frame[1] = sample.right;
                }
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
            None => frame.fill(0.0),
        }
    }
}

/// Convert one interleaved capture frame to stereo (mono is duplicated)
fn capture_frame(frame: &[f32]) -> StereoSample {
    match frame {
        [] => StereoSample::silence(),
        [mono] => StereoSample::mono(*mono),
        [left, right, ..] => StereoSample::new(*left, *right),
    }
}

/// Pick a stream configuration for one side of a device
///
/// Prefers f32 at the requested sample rate, stereo for playback.
fn get_stream_config(
    device: &cpal::Device,
    direction: Direction,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported = supported_configs(device, direction)?;
    select_stream_config(&supported, direction, config.target_sample_rate())
}

/// Choose among a device's supported configurations
///
/// Only f32 configurations qualify (both callbacks are f32). Among those,
/// enough channels at the target rate wins, then any channel count at the
/// target rate, then any f32 configuration at its highest rate.
fn select_stream_config(
    supported: &[cpal::SupportedStreamConfigRange],
    direction: Direction,
    target_sample_rate: u32,
) -> AudioResult<cpal::SupportedStreamConfig> {
    if supported.is_empty() {
        return Err(AudioError::ConfigError(format!(
            "No supported {:?} configurations",
            direction
        )));
    }

    let min_channels = match direction {
        Direction::Input => 1,
        Direction::Output => 2,
    };
    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };
    let f32_configs: Vec<&cpal::SupportedStreamConfigRange> = supported
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let best = f32_configs
        .iter()
        .copied()
        .filter(|c| c.channels() >= min_channels)
        .find(in_range)
        .or_else(|| f32_configs.iter().copied().find(in_range))
        .or_else(|| f32_configs.first().copied())
        .ok_or_else(|| {
            AudioError::ConfigError(format!("{:?} device offers no f32 format", direction))
        })?;

    let sample_rate = if in_range(&best) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "{:?} device doesn't support {}Hz, falling back to {}Hz",
            direction,
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: rtrb::Producer<StereoSample>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    // Queue full means playback stalled; drop rather than block
                    if producer.push(capture_frame(frame)).is_err() {
                        break;
                    }
                }
            },
            move |err| {
                log::error!("Input audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Input: {}", e)))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut state: LiveCallbackState,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
                    state.process(chunk, channels);
                }
            },
            move |err| {
                log::error!("Output audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glitch::GlitchMode;

    #[test]
    fn test_capture_frame_layouts() {
        assert_eq!(capture_frame(&[0.25]), StereoSample::new(0.25, 0.25));
        assert_eq!(capture_frame(&[0.1, 0.2]), StereoSample::new(0.1, 0.2));
        assert_eq!(capture_frame(&[0.1, 0.2, 0.9, 0.9]), StereoSample::new(0.1, 0.2));
        assert_eq!(capture_frame(&[]), StereoSample::silence());
    }

    #[test]
    fn test_write_interleaved_pads_extra_channels() {
        let samples = [StereoSample::new(1.0, 2.0)];
        let mut data = [9.0f32; 8];
        write_interleaved(&mut data, 4, &samples);
        assert_eq!(data, [1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let mut mono = [9.0f32; 2];
        write_interleaved(&mut mono, 1, &samples);
        assert_eq!(mono, [1.0, 0.0]);
    }

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> cpal::SupportedStreamConfigRange {
        cpal::SupportedStreamConfigRange::new(
            channels,
            cpal::SampleRate(min),
            cpal::SampleRate(max),
            cpal::SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn test_select_rejects_devices_without_f32() {
        let supported = [
            range(2, 44100, 48000, SampleFormat::I16),
            range(2, 44100, 96000, SampleFormat::I32),
        ];
        let err = select_stream_config(&supported, Direction::Output, 48000).unwrap_err();
        assert!(matches!(err, AudioError::ConfigError(ref msg) if msg.contains("no f32")));

        assert!(matches!(
            select_stream_config(&[], Direction::Input, 48000),
            Err(AudioError::ConfigError(_))
        ));
    }

    #[test]
    fn test_select_prefers_stereo_f32_at_target_rate() {
        let supported = [
            range(2, 44100, 48000, SampleFormat::I16),
            range(1, 8000, 192000, SampleFormat::F32),
            range(2, 8000, 192000, SampleFormat::F32),
        ];
        let output = select_stream_config(&supported, Direction::Output, 48000).unwrap();
        assert_eq!(output.sample_format(), SampleFormat::F32);
        assert_eq!(output.channels(), 2);
        assert_eq!(output.sample_rate().0, 48000);

        // Mono is enough for capture, first match wins
        let input = select_stream_config(&supported, Direction::Input, 48000).unwrap();
        assert_eq!(input.channels(), 1);
    }

    #[test]
    fn test_select_falls_back_to_highest_f32_rate() {
        let supported = [
            range(2, 44100, 44100, SampleFormat::F32),
            range(2, 48000, 48000, SampleFormat::I16),
        ];
        let config = select_stream_config(&supported, Direction::Output, 48000).unwrap();
        assert_eq!(config.sample_format(), SampleFormat::F32);
        assert_eq!(config.sample_rate().0, 44100);
    }

    #[test]
    fn test_callback_state_runs_engine_and_counts_underruns() {
        let engine = GlitchEngine::new_with_sample_rate(1000).unwrap();
        let handle = engine.handle();
        let (mut tx, rx) = rtrb::RingBuffer::<StereoSample>::new(64);
        let underruns = Arc::new(AtomicU64::new(0));
        let mut state = LiveCallbackState::new(engine, rx, Arc::clone(&underruns));

        for i in 0..6 {
            tx.push(StereoSample::mono(i as f32)).unwrap();
        }

        // 8 stereo frames requested, 6 available
        let mut data = [0.0f32; 16];
        state.process(&mut data, 2);
        assert_eq!(&data[..12], &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0]);
        assert_eq!(&data[12..], &[0.0; 4]);
        assert_eq!(underruns.load(Ordering::Relaxed), 2);

        // Pad press from the control thread lands on the next callback
        handle.press(GlitchMode::TapeStop);
        let mut data = [0.0f32; 2];
        state.process(&mut data, 2);
        assert_eq!(handle.active_mode(), GlitchMode::TapeStop);
    }
}
