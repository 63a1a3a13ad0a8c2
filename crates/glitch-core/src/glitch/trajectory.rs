//! Read-head trajectories
//!
//! Every mode is a pure function of `delta`, the number of frames elapsed
//! since the freeze point, so freezing anywhere in a performance replays a
//! self-consistent window. Positions come back unwrapped; the sampler wraps
//! them into the ring.
//!
//! | Mode         | Position                                  | Gain                  |
//! |--------------|-------------------------------------------|-----------------------|
//! | Clean        | `w`                                       | 1                     |
//! | Stutter 1/n  | `f + delta % (B / k)`, k = 1, 2, 4, 8     | 1                     |
//! | Reverse      | `f - delta`                               | 1                     |
//! | ReverseLoop  | `f + (B - delta % B)`                     | 1                     |
//! | SlowDown     | `f + delta / 2`                           | 1                     |
//! | TapeStop     | `f + delta - delta * t / 2`, t = delta/2B | 1, then 0 once t >= 1 |
//! | Backspin     | `f - 1.5 * (delta % (B / 2))`             | 1                     |
//! | TranceGate   | `w`                                       | 0 on odd B/8 steps    |
//! | Shuffle      | `w - B/4` in the back half of each B/2    | 1                     |
//!
//! TranceGate and Shuffle follow the write cursor rather than the freeze
//! point: they manipulate the live signal instead of a frozen window.

use crate::types::Sample;

use super::mode::GlitchMode;

/// Buffer geometry shared by every trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Ring capacity in frames (L)
    pub capacity: usize,
    /// Beat length in frames (B), fractional at odd sample rates
    pub beat_len: f64,
}

impl Timing {
    pub fn new(capacity: usize, beat_len: f64) -> Self {
        Self {
            capacity: capacity.max(1),
            beat_len,
        }
    }
}

/// Cursor state feeding a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Write cursor (w)
    pub write_pos: usize,
    /// Freeze point (f)
    pub freeze_pos: usize,
    /// Frames processed since the freeze, not wrapped
    ///
    /// Equal to `delta` until the ring wraps; TapeStop uses it so the stop
    /// latches instead of restarting after a full buffer length.
    pub elapsed: u64,
}

impl Cursor {
    /// Cursor whose elapsed count is derived from the wrapped distance
    pub fn at(write_pos: usize, freeze_pos: usize, capacity: usize) -> Self {
        Self {
            write_pos,
            freeze_pos,
            elapsed: delta(write_pos, freeze_pos, capacity) as u64,
        }
    }
}

/// Read position and gate for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    /// Unwrapped read position in frames
    pub position: f64,
    /// Gate multiplier applied after interpolation
    pub gain: Sample,
}

impl Trajectory {
    #[inline]
    fn open(position: f64) -> Self {
        Self { position, gain: 1.0 }
    }

    #[inline]
    fn gated(position: f64, gain: Sample) -> Self {
        Self { position, gain }
    }
}

/// Frames elapsed since the freeze point, wrapped into [0, capacity)
#[inline]
pub fn delta(write_pos: usize, freeze_pos: usize, capacity: usize) -> usize {
    let capacity = capacity.max(1) as i64;
    (write_pos as i64 - freeze_pos as i64).rem_euclid(capacity) as usize
}

/// Compute the read position and gate for `mode`
#[inline]
pub fn compute(mode: GlitchMode, cursor: &Cursor, timing: &Timing) -> Trajectory {
    let w = cursor.write_pos as f64;
    let f = cursor.freeze_pos as f64;
    let d = delta(cursor.write_pos, cursor.freeze_pos, timing.capacity) as f64;
    let beat = timing.beat_len;

    match mode {
        GlitchMode::Clean => Trajectory::open(w),
        GlitchMode::StutterHalf => stutter(f, d, beat),
        GlitchMode::StutterQuarter => stutter(f, d, beat / 2.0),
        GlitchMode::StutterEighth => stutter(f, d, beat / 4.0),
        GlitchMode::StutterSixteenth => stutter(f, d, beat / 8.0),
        GlitchMode::Reverse => Trajectory::open(f - d),
        GlitchMode::ReverseLoop => Trajectory::open(f + (beat - d % beat)),
        GlitchMode::SlowDown => Trajectory::open(f + d * 0.5),
        GlitchMode::TapeStop => tape_stop(w, f, d, cursor.elapsed, beat),
        GlitchMode::Backspin => Trajectory::open(f - 1.5 * (d % (beat / 2.0))),
        GlitchMode::TranceGate => trance_gate(w, d, beat),
        GlitchMode::Shuffle => shuffle(w, d, beat),
    }
}

/// Repeat the `window` frames that follow the freeze point
#[inline]
fn stutter(f: f64, d: f64, window: f64) -> Trajectory {
    Trajectory::open(f + d % window)
}

/// Quadratic power-down over two beats, muted once stopped
#[inline]
fn tape_stop(w: f64, f: f64, d: f64, elapsed: u64, beat: f64) -> Trajectory {
    let t = elapsed as f64 / (beat * 2.0);
    if t < 1.0 {
        Trajectory::open(f + (d - 0.5 * d * t))
    } else {
        Trajectory::gated(w, 0.0)
    }
}

/// Mute every other eighth-beat step
#[inline]
fn trance_gate(w: f64, d: f64, beat: f64) -> Trajectory {
    let step = (d / (beat / 8.0)).floor() as u64;
    let gain = if step % 2 == 1 { 0.0 } else { 1.0 };
    Trajectory::gated(w, gain)
}

/// Jump back a quarter beat during the second half of every half beat
#[inline]
fn shuffle(w: f64, d: f64, beat: f64) -> Trajectory {
    let jump = beat / 2.0;
    let offset = if d % jump > jump / 2.0 { jump / 2.0 } else { 0.0 };
    Trajectory::open(w - offset)
}
