//! Common types for Glitch
//!
//! Fundamental audio types shared by the engine, the live host and the
//! offline renderer.

use std::ops::{Index, IndexMut};

/// Frames per processing block (matches the typical host callback size)
pub const BLOCK_SIZE: usize = 512;

/// Audio sample type
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// `#[repr(C)]` keeps the layout [left, right] so that `&[StereoSample]`
/// can be viewed as interleaved `&[f32]` through bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Same value in both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// A buffer of stereo samples
///
/// Block-sized working buffer used by the host callbacks and the renderer.
/// Pre-allocate with [`StereoBuffer::silence`] and resize with
/// [`StereoBuffer::set_len_from_capacity`] on the audio thread.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from an existing Vec of StereoSamples
    pub fn from_vec(samples: Vec<StereoSample>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Growing past the allocated capacity would allocate, so callers on the
    /// audio thread must pre-size the buffer for the largest block.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        if new_len > self.samples.len() {
            debug_assert!(
                new_len <= self.samples.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Zero-copy view as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Append a sample (allocates when over capacity; not for the audio thread)
    #[inline]
    pub fn push(&mut self, sample: StereoSample) {
        self.samples.push(sample);
    }

    /// Append all samples of another buffer
    pub fn extend_from(&mut self, other: &StereoBuffer) {
        self.samples.extend_from_slice(&other.samples);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Peak amplitude over the whole buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_scale() {
        let scaled = StereoSample::new(1.0, -2.0) * 0.5;
        assert_eq!(scaled.left, 0.5);
        assert_eq!(scaled.right, -1.0);
        assert_eq!(scaled.peak(), 1.0);
    }

    #[test]
    fn test_frames_are_interleaved_in_memory() {
        let buffer =
            StereoBuffer::from_vec(vec![StereoSample::new(1.0, 2.0), StereoSample::new(3.0, 4.0)]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_interleaved(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_set_len_from_capacity_stays_within_allocation() {
        let mut buffer = StereoBuffer::silence(BLOCK_SIZE);
        buffer.set_len_from_capacity(128);
        assert_eq!(buffer.len(), 128);
        buffer.set_len_from_capacity(BLOCK_SIZE);
        assert_eq!(buffer.len(), BLOCK_SIZE);
        assert!(buffer.iter().all(|s| *s == StereoSample::silence()));
    }
}
