//! The glitch engine
//!
//! Per frame: record the input at the write cursor, pick up any pending mode
//! request, compute the active mode's trajectory, read both channels at that
//! position, apply the gate and advance the cursor.
//!
//! ```text
//! input ──► RingBuffer.record ──► trajectory(mode, w, f) ──► sampler ──► × gate ──► output
//!                 │                                                            │
//!                 └───────────────────── advance cursor ◄──────────────────────┘
//! ```
//!
//! The engine is owned by the audio thread. Control surfaces talk to it
//! through a [`ModeHandle`]; nothing on the processing path allocates,
//! locks or blocks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::GlitchResult;
use crate::types::{Sample, StereoBuffer, StereoSample};

use super::controller::{GlitchAtomics, ModeController, ModeHandle};
use super::mode::GlitchMode;
use super::ring::RingBuffer;
use super::sampler;
use super::trajectory::{self, Timing, Trajectory};

/// Saved engine state
///
/// Only the mode is persisted; buffer contents and freeze point are
/// performance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlitchState {
    /// Mode id (0-11)
    pub mode: u8,
}

/// Real-time glitch engine over a continuously recording stereo ring buffer
pub struct GlitchEngine {
    ring: RingBuffer,
    controller: ModeController,
    atomics: Arc<GlitchAtomics>,
    timing: Timing,
    sample_rate: u32,
}

impl GlitchEngine {
    /// Create an engine with the default geometry (4 s buffer, 120 BPM beat)
    pub fn new_with_sample_rate(sample_rate: u32) -> GlitchResult<Self> {
        Self::new(sample_rate, &EngineConfig::default())
    }

    /// Create an engine; all buffers are allocated here and never again
    pub fn new(sample_rate: u32, config: &EngineConfig) -> GlitchResult<Self> {
        let geometry = config.geometry(sample_rate)?;

        log::info!(
            "GlitchEngine: {}Hz, ring {} frames ({:.1}s), beat {:.1} frames",
            sample_rate,
            geometry.capacity,
            config.buffer_seconds,
            geometry.beat_len
        );

        Ok(Self {
            ring: RingBuffer::new(geometry.capacity),
            controller: ModeController::new(),
            atomics: Arc::new(GlitchAtomics::new()),
            timing: Timing::new(geometry.capacity, geometry.beat_len),
            sample_rate,
        })
    }

    /// Control-surface handle sharing this engine's atomics
    pub fn handle(&self) -> ModeHandle {
        ModeHandle::new(Arc::clone(&self.atomics))
    }

    /// Shared atomics for lock-free state reads
    pub fn atomics(&self) -> Arc<GlitchAtomics> {
        Arc::clone(&self.atomics)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Ring capacity in frames (L)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Beat length in frames (B)
    #[inline]
    pub fn beat_len(&self) -> f64 {
        self.timing.beat_len
    }

    #[inline]
    pub fn mode(&self) -> GlitchMode {
        self.controller.mode()
    }

    #[inline]
    pub fn freeze_point(&self) -> usize {
        self.controller.freeze_pos()
    }

    #[inline]
    pub fn write_pos(&self) -> usize {
        self.ring.write_pos()
    }

    /// Select a mode from the thread that owns the engine
    ///
    /// Goes through the same request path as a [`ModeHandle`] so both stay
    /// consistent, then applies immediately: the next processed frame is the
    /// freeze frame.
    pub fn set_mode(&mut self, mode: GlitchMode) {
        self.atomics.request(mode);
        self.apply_requests();
    }

    /// Select a mode by id; ids outside 0-11 are ignored
    pub fn set_mode_id(&mut self, id: u8) -> bool {
        match GlitchMode::from_index(id) {
            Some(mode) => {
                self.set_mode(mode);
                true
            }
            None => {
                log::warn!("GlitchEngine: ignoring unknown mode id {}", id);
                false
            }
        }
    }

    /// Mode id for saving
    pub fn persisted_mode(&self) -> u8 {
        self.controller.mode().index()
    }

    /// Restore a saved mode id (re-activates it with a fresh freeze point)
    pub fn restore_mode(&mut self, id: u8) {
        self.set_mode_id(id);
    }

    pub fn state(&self) -> GlitchState {
        GlitchState {
            mode: self.persisted_mode(),
        }
    }

    pub fn restore_state(&mut self, state: &GlitchState) {
        self.restore_mode(state.mode);
    }

    /// Trajectory the next processed frame will follow
    pub fn next_trajectory(&self) -> Trajectory {
        let cursor = self.controller.cursor(self.ring.write_pos());
        trajectory::compute(self.controller.mode(), &cursor, &self.timing)
    }

    /// Process one frame
    #[inline]
    pub fn process_frame(&mut self, input: StereoSample) -> StereoSample {
        let write_pos = self.ring.write_pos();
        if self.controller.poll(&self.atomics, write_pos) {
            self.publish();
        }

        self.ring.record(input.left, input.right);

        let cursor = self.controller.cursor(write_pos);
        let t = trajectory::compute(self.controller.mode(), &cursor, &self.timing);
        let output = sampler::read_stereo(&self.ring, t.position) * t.gain;

        self.ring.advance();
        self.controller.tick();
        output
    }

    /// Process a block given as separate channel slices
    ///
    /// Processes `min` of the four slice lengths; any remaining output frames
    /// are left untouched.
    pub fn process(
        &mut self,
        input_l: &[Sample],
        input_r: &[Sample],
        output_l: &mut [Sample],
        output_r: &mut [Sample],
    ) {
        debug_assert_eq!(input_l.len(), input_r.len(), "input channel lengths differ");
        debug_assert_eq!(output_l.len(), output_r.len(), "output channel lengths differ");

        let frames = input_l
            .len()
            .min(input_r.len())
            .min(output_l.len())
            .min(output_r.len());

        for i in 0..frames {
            let out = self.process_frame(StereoSample::new(input_l[i], input_r[i]));
            output_l[i] = out.left;
            output_r[i] = out.right;
        }
        self.publish();
    }

    /// Process a stereo buffer in place
    pub fn process_buffer(&mut self, buffer: &mut StereoBuffer) {
        for sample in buffer.iter_mut() {
            *sample = self.process_frame(*sample);
        }
        self.publish();
    }

    /// Silence the history and return to Clean
    ///
    /// Not real-time cheap (touches the whole ring); call between sessions.
    pub fn reset(&mut self) {
        self.set_mode(GlitchMode::Clean);
        self.ring.clear();
        self.publish();
    }

    fn apply_requests(&mut self) {
        if self.controller.poll(&self.atomics, self.ring.write_pos()) {
            self.publish();
        }
    }

    #[inline]
    fn publish(&self) {
        self.atomics.publish(
            self.controller.mode(),
            self.controller.freeze_pos(),
            self.ring.write_pos(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    fn engine() -> GlitchEngine {
        GlitchEngine::new_with_sample_rate(SR).unwrap()
    }

    /// Ramp input: frame n carries the value n, so outputs reveal read positions
    fn ramp(engine: &mut GlitchEngine, frames: usize) -> Vec<f32> {
        let start = engine.write_pos();
        (0..frames)
            .map(|i| {
                let v = (start + i) as f32;
                engine.process_frame(StereoSample::new(v, -v)).left
            })
            .collect()
    }

    #[test]
    fn test_geometry_follows_sample_rate() {
        let e = engine();
        assert_eq!(e.capacity(), 176_400);
        assert_eq!(e.beat_len(), 22_050.0);
        assert_eq!(e.mode(), GlitchMode::Clean);
    }

    #[test]
    fn test_clean_reproduces_input() {
        let mut e = engine();
        let input_l: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.013).sin()).collect();
        let input_r: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.029).cos()).collect();
        let mut out_l = vec![0.0; 1024];
        let mut out_r = vec![0.0; 1024];

        e.process(&input_l, &input_r, &mut out_l, &mut out_r);

        assert_eq!(out_l, input_l);
        assert_eq!(out_r, input_r);
        assert_eq!(e.write_pos(), 1024);
    }

    #[test]
    fn test_freeze_frame_reads_freeze_point() {
        let mut e = engine();
        ramp(&mut e, 1000);
        assert_eq!(e.write_pos(), 1000);

        e.set_mode(GlitchMode::StutterHalf);
        assert_eq!(e.freeze_point(), 1000);
        assert_eq!(e.next_trajectory().position, 1000.0);

        let out = ramp(&mut e, 1);
        assert_eq!(out[0], 1000.0);
    }

    #[test]
    fn test_stutter_half_loops_after_one_beat() {
        let mut e = engine();
        e.set_mode(GlitchMode::StutterHalf);
        let out = ramp(&mut e, 22050 + 10);

        assert_eq!(out[11025], 11025.0);
        // One full repeat: back to the freeze frame
        assert_eq!(out[22050], 0.0);
        assert_eq!(out[22055], 5.0);
    }

    #[test]
    fn test_reverse_reads_recorded_history_backwards() {
        let mut e = engine();
        ramp(&mut e, 5000);
        e.set_mode(GlitchMode::Reverse);
        let out = ramp(&mut e, 201);
        assert_eq!(out[0], 5000.0);
        assert_eq!(out[200], 4800.0);
    }

    #[test]
    fn test_reverse_wraps_below_zero() {
        let mut e = engine();
        let capacity = e.capacity();
        // Fill the whole ring so the tail holds known values
        ramp(&mut e, capacity);
        assert_eq!(e.write_pos(), 0);

        ramp(&mut e, 100);
        e.set_mode(GlitchMode::Reverse);
        let out = ramp(&mut e, 300);
        // Frame 250 reads 100 - 250 = -150 -> capacity - 150, recorded on the first pass
        assert_eq!(out[250], (capacity - 150) as f32);
    }

    #[test]
    fn test_recording_continues_while_glitching() {
        let mut e = engine();
        e.set_mode(GlitchMode::TapeStop);
        ramp(&mut e, 3000);
        assert_eq!(e.write_pos(), 3000);

        e.set_mode(GlitchMode::Clean);
        let out = ramp(&mut e, 1);
        assert_eq!(out[0], 3000.0);
    }

    #[test]
    fn test_tape_stop_stays_silent_until_mode_change() {
        let mut e = engine();
        e.set_mode(GlitchMode::TapeStop);
        let stop = (e.beat_len() * 2.0) as usize;
        let capacity = e.capacity();

        // Run past the stop and past a full wrap of the ring
        let out = ramp(&mut e, capacity + stop + 500);
        assert!(out[..stop - 1].iter().skip(1).all(|&s| s != 0.0));
        assert!(out[stop..].iter().all(|&s| s == 0.0));

        e.set_mode(GlitchMode::Clean);
        let out = ramp(&mut e, 1);
        assert_ne!(out[0], 0.0);
    }

    #[test]
    fn test_trance_gate_mutes_odd_steps_live() {
        let mut e = engine();
        e.set_mode(GlitchMode::TranceGate);
        let out = ramp(&mut e, 6000);
        // Step length 2756.25 frames
        assert_eq!(out[0], 0.0); // open, live input is the value 0
        assert_eq!(out[1378], 1378.0);
        assert_eq!(out[2757], 0.0);
        assert_eq!(out[5600], 5600.0);
    }

    #[test]
    fn test_reselecting_mode_keeps_freeze_point() {
        let mut e = engine();
        ramp(&mut e, 100);
        e.set_mode(GlitchMode::Backspin);
        ramp(&mut e, 50);
        e.set_mode(GlitchMode::Backspin);
        assert_eq!(e.freeze_point(), 100);
    }

    #[test]
    fn test_handle_requests_apply_at_frame_boundary() {
        let mut e = engine();
        let handle = e.handle();
        ramp(&mut e, 10);

        handle.press(GlitchMode::SlowDown);
        assert_eq!(e.mode(), GlitchMode::Clean);

        ramp(&mut e, 5);
        assert_eq!(e.mode(), GlitchMode::SlowDown);
        assert_eq!(e.freeze_point(), 10);
        assert_eq!(handle.active_mode(), GlitchMode::SlowDown);
        assert_eq!(handle.freeze_point(), 10);
    }

    #[test]
    fn test_release_and_press_between_blocks_refreezes_for_readers() {
        let mut e = engine();
        let handle = e.handle();
        let mut block = StereoBuffer::silence(256);

        handle.press(GlitchMode::StutterQuarter);
        e.process_buffer(&mut block);
        assert_eq!(handle.active_mode(), GlitchMode::StutterQuarter);
        assert_eq!(handle.freeze_point(), 0);

        // Both land before the next block: the mode is re-entered at the new cursor
        handle.release();
        handle.press(GlitchMode::StutterQuarter);
        e.process_buffer(&mut block);
        assert_eq!(handle.active_mode(), GlitchMode::StutterQuarter);
        assert_eq!(handle.freeze_point(), 256);
        assert_eq!(e.controller.elapsed(), 256);
    }

    #[test]
    fn test_process_buffer_publishes_write_cursor() {
        let mut e = engine();
        let handle = e.handle();
        let mut buffer = StereoBuffer::silence(512);
        e.process_buffer(&mut buffer);
        assert_eq!(handle.write_pos(), 512);
    }

    #[test]
    fn test_state_save_and_restore() {
        let mut e = engine();
        e.set_mode(GlitchMode::Shuffle);
        let state = e.state();
        assert_eq!(state, GlitchState { mode: 11 });
        assert_eq!(e.persisted_mode(), 11);

        let mut restored = engine();
        ramp(&mut restored, 42);
        restored.restore_state(&state);
        assert_eq!(restored.mode(), GlitchMode::Shuffle);
        assert_eq!(restored.freeze_point(), 42);

        restored.restore_mode(99);
        assert_eq!(restored.mode(), GlitchMode::Shuffle);
    }

    #[test]
    fn test_mode_switch_into_clean_is_continuous() {
        let mut e = engine();
        ramp(&mut e, 2000);
        e.set_mode(GlitchMode::StutterSixteenth);
        ramp(&mut e, 100);
        e.set_mode(GlitchMode::Clean);
        let out = ramp(&mut e, 3);
        // Clean resumes the live signal immediately
        assert_eq!(out, vec![2100.0, 2101.0, 2102.0]);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut e = engine();
        ramp(&mut e, 100);
        e.set_mode(GlitchMode::Reverse);
        e.reset();
        assert_eq!(e.mode(), GlitchMode::Clean);
        assert_eq!(e.write_pos(), 0);

        e.set_mode(GlitchMode::Reverse);
        let out = ramp(&mut e, 1);
        assert_eq!(out[0], 0.0);
        let out: Vec<f32> = (0..10)
            .map(|_| e.process_frame(StereoSample::mono(1.0)).left)
            .collect();
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
