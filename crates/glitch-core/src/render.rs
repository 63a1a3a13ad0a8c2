//! Offline rendering through the glitch engine
//!
//! Runs a WAV file (or an in-memory buffer) through a [`GlitchEngine`] while
//! replaying a schedule of pad presses. Blocks are split at event frames so
//! every event lands on its exact frame, the same as a sample-accurate
//! control surface would.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::config::EngineConfig;
use crate::error::{GlitchError, GlitchResult};
use crate::glitch::{GlitchEngine, GlitchMode};
use crate::types::{StereoBuffer, StereoSample, BLOCK_SIZE};

/// A mode change at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeEvent {
    /// Time from the start of the render in seconds
    pub seconds: f64,
    /// Mode to select (Clean releases)
    pub mode: GlitchMode,
}

impl ModeEvent {
    pub fn new(seconds: f64, mode: GlitchMode) -> Self {
        Self { seconds, mode }
    }

    /// Frame index at `sample_rate`
    pub fn frame(&self, sample_rate: u32) -> usize {
        (self.seconds * sample_rate as f64).round() as usize
    }

    /// Parse a `SECONDS:MODE` entry, e.g. `1.5:tape-stop` or `2:0`
    pub fn parse(entry: &str) -> GlitchResult<Self> {
        let invalid = |reason: &str| GlitchError::InvalidSchedule {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (time, mode) = entry
            .split_once(':')
            .ok_or_else(|| invalid("expected SECONDS:MODE"))?;
        let seconds: f64 = time
            .trim()
            .parse()
            .map_err(|_| invalid("time is not a number"))?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid("time must be a non-negative number of seconds"));
        }
        let mode: GlitchMode = mode.parse()?;
        Ok(Self { seconds, mode })
    }
}

/// Time-ordered list of mode events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeSchedule {
    events: Vec<ModeEvent>,
}

impl ModeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `SECONDS:MODE` entries in any order
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> GlitchResult<Self> {
        let mut schedule = Self::new();
        for entry in entries {
            schedule.push(ModeEvent::parse(entry.as_ref())?);
        }
        Ok(schedule)
    }

    /// Insert an event, keeping time order (events at the same time keep insertion order)
    pub fn push(&mut self, event: ModeEvent) {
        let idx = self.events.partition_point(|e| e.seconds <= event.seconds);
        self.events.insert(idx, event);
    }

    /// Builder form of [`ModeSchedule::push`]
    pub fn at(mut self, seconds: f64, mode: GlitchMode) -> Self {
        self.push(ModeEvent::new(seconds, mode));
        self
    }

    pub fn events(&self) -> &[ModeEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Outcome of a render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    /// Frames written
    pub frames: usize,
    pub sample_rate: u32,
    /// Events that fell inside the input and were applied
    pub events_applied: usize,
    /// Output peak amplitude
    pub peak: f32,
}

/// Run `input` through `engine`, applying `schedule` at exact frames
///
/// Events at or past the end of the input are not applied.
pub fn render_buffer(
    engine: &mut GlitchEngine,
    input: &StereoBuffer,
    schedule: &ModeSchedule,
) -> (StereoBuffer, usize) {
    let total = input.len();
    let sample_rate = engine.sample_rate();
    let mut output = StereoBuffer::from_vec(Vec::with_capacity(total));
    let mut block = StereoBuffer::silence(BLOCK_SIZE);
    let mut events = schedule.events().iter().peekable();
    let mut applied = 0;
    let mut pos = 0;

    while pos < total {
        while let Some(event) = events.next_if(|e| e.frame(sample_rate) <= pos) {
            log::debug!("render: frame {} -> {}", pos, event.mode);
            engine.set_mode(event.mode);
            applied += 1;
        }

        let mut end = (pos + BLOCK_SIZE).min(total);
        if let Some(next) = events.peek() {
            end = end.min(next.frame(sample_rate));
        }

        block.set_len_from_capacity(end - pos);
        block
            .as_mut_slice()
            .copy_from_slice(&input.as_slice()[pos..end]);
        engine.process_buffer(&mut block);
        output.extend_from(&block);
        pos = end;
    }

    (output, applied)
}

/// Read a WAV file as stereo (mono is duplicated, extra channels dropped)
pub fn read_wav(path: &Path) -> GlitchResult<(StereoBuffer, u32)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(GlitchError::UnsupportedWav(format!(
            "{:?} has no channels",
            path
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let frames = interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let left = frame[0];
            let right = if channels > 1 { frame[1] } else { frame[0] };
            StereoSample::new(left, right)
        })
        .collect();

    log::info!(
        "read_wav: {:?} ({} ch, {}Hz, {}-bit {:?})",
        path,
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );

    Ok((StereoBuffer::from_vec(frames), spec.sample_rate))
}

/// Write a stereo buffer as 32-bit float WAV
pub fn write_wav(path: &Path, buffer: &StereoBuffer, sample_rate: u32) -> GlitchResult<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in buffer.as_interleaved() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Render `input` to `output` through a fresh engine at the file's sample rate
pub fn render_file(
    input: &Path,
    output: &Path,
    schedule: &ModeSchedule,
    config: &EngineConfig,
) -> GlitchResult<RenderSummary> {
    let (source, sample_rate) = read_wav(input)?;
    let mut engine = GlitchEngine::new(sample_rate, config)?;

    let (rendered, events_applied) = render_buffer(&mut engine, &source, schedule);
    if events_applied < schedule.events().len() {
        log::warn!(
            "render: {} event(s) fall after the end of {:?} and were skipped",
            schedule.events().len() - events_applied,
            input
        );
    }

    write_wav(output, &rendered, sample_rate)?;

    let summary = RenderSummary {
        frames: rendered.len(),
        sample_rate,
        events_applied,
        peak: rendered.peak(),
    };
    log::info!(
        "render: wrote {} frames to {:?} (peak {:.3})",
        summary.frames,
        output,
        summary.peak
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1kHz keeps frame/second conversions exact: ring 4000 frames, beat 500
    const SR: u32 = 1000;

    fn ramp(frames: usize) -> StereoBuffer {
        StereoBuffer::from_vec((0..frames).map(|i| StereoSample::mono(i as f32)).collect())
    }

    #[test]
    fn test_parse_event() {
        let event = ModeEvent::parse("1.5:tape-stop").unwrap();
        assert_eq!(event, ModeEvent::new(1.5, GlitchMode::TapeStop));
        assert_eq!(event.frame(44100), 66150);

        assert_eq!(ModeEvent::parse(" 2 : 0").unwrap().mode, GlitchMode::Clean);
        assert!(matches!(
            ModeEvent::parse("1.5"),
            Err(GlitchError::InvalidSchedule { .. })
        ));
        assert!(matches!(
            ModeEvent::parse("-1:reverse"),
            Err(GlitchError::InvalidSchedule { .. })
        ));
        assert!(matches!(
            ModeEvent::parse("1:wobble"),
            Err(GlitchError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_schedule_is_time_ordered() {
        let schedule = ModeSchedule::parse(&["2:0", "0.5:reverse", "1:backspin"]).unwrap();
        let times: Vec<f64> = schedule.events().iter().map(|e| e.seconds).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_events_split_blocks_at_exact_frames() {
        let mut engine = GlitchEngine::new_with_sample_rate(SR).unwrap();
        // Freeze at frame 700 (mid-block), release at frame 900
        let schedule = ModeSchedule::new()
            .at(0.7, GlitchMode::StutterSixteenth)
            .at(0.9, GlitchMode::Clean);

        let (out, applied) = render_buffer(&mut engine, &ramp(1200), &schedule);
        assert_eq!(applied, 2);
        assert_eq!(out.len(), 1200);

        assert_eq!(out[699].left, 699.0);
        // Stutter window is 500 / 8 = 62.5 frames from the freeze at 700
        assert_eq!(out[700].left, 700.0);
        assert_eq!(out[762].left, 762.0);
        assert_eq!(out[763].left, 700.5);
        assert_eq!(out[900].left, 900.0);
    }

    #[test]
    fn test_events_past_the_end_are_skipped() {
        let mut engine = GlitchEngine::new_with_sample_rate(SR).unwrap();
        let schedule = ModeSchedule::new().at(5.0, GlitchMode::Reverse);
        let input = ramp(100);
        let (out, applied) = render_buffer(&mut engine, &input, &schedule);
        assert_eq!(applied, 0);
        assert_eq!(out.as_slice(), input.as_slice());
    }

    #[test]
    fn test_render_file_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.wav");
        let output_path = dir.path().join("out.wav");

        // 16-bit mono source
        let spec = WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&input_path, spec).unwrap();
        for _ in 0..2000 {
            writer.write_sample(16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let schedule = ModeSchedule::new().at(1.0, GlitchMode::TapeStop);
        let summary =
            render_file(&input_path, &output_path, &schedule, &EngineConfig::default()).unwrap();
        assert_eq!(summary.frames, 2000);
        assert_eq!(summary.sample_rate, SR);
        assert_eq!(summary.events_applied, 1);
        assert!((summary.peak - 0.5).abs() < 1e-6);

        let (rendered, sample_rate) = read_wav(&output_path).unwrap();
        assert_eq!(sample_rate, SR);
        assert_eq!(rendered.len(), 2000);
        // Mono source duplicated into both channels
        assert_eq!(rendered[10].left, rendered[10].right);
        assert!((rendered[10].left - 0.5).abs() < 1e-6);
        // Input ends one frame before the two-beat stop completes, so nothing is muted yet
        assert!((rendered[1999].left - 0.5).abs() < 1e-6);
    }
}
