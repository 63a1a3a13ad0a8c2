//! Fractional-position reads from the ring buffer
//!
//! Plain 2-point linear interpolation, constant cost per sample.

use crate::types::{Sample, StereoSample};

use super::ring::RingBuffer;

/// Wrap a real-valued position into [0, len)
///
/// Non-finite positions map to 0 so a read can never index out of range.
#[inline]
pub fn normalize(position: f64, len: usize) -> f64 {
    let len = len as f64;
    if !position.is_finite() || len <= 0.0 {
        return 0.0;
    }
    let wrapped = position.rem_euclid(len);
    // rem_euclid can round a tiny negative value up to exactly `len`
    if wrapped >= len {
        0.0
    } else {
        wrapped
    }
}

/// Read `buffer` at a fractional position with linear interpolation
///
/// `position` may be negative or beyond the buffer end; it is wrapped first.
/// The frame after the last one is the first one.
#[inline]
pub fn read(buffer: &[Sample], position: f64) -> Sample {
    let len = buffer.len();
    if len == 0 {
        return 0.0;
    }
    let pos = normalize(position, len);
    let i0 = (pos as usize).min(len - 1);
    let i1 = (i0 + 1) % len;
    let frac = (pos - i0 as f64) as Sample;
    let s0 = buffer[i0];
    let s1 = buffer[i1];
    s0 + frac * (s1 - s0)
}

/// Read both channels of the ring at the same position
#[inline]
pub fn read_stereo(ring: &RingBuffer, position: f64) -> StereoSample {
    StereoSample::new(read(ring.left(), position), read(ring.right(), position))
}
