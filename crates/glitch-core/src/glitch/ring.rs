//! Continuously recording stereo ring buffer
//!
//! Two parallel channel buffers sized once at construction and a write
//! cursor that advances and wraps on every frame, whatever the active mode.
//! Recording never stops, so a freeze can be captured at any instant with
//! the most recent history intact.

use crate::types::Sample;

/// Fixed-capacity per-channel sample store with a wrapping write cursor
pub struct RingBuffer {
    /// Left channel samples
    left: Box<[Sample]>,
    /// Right channel samples
    right: Box<[Sample]>,
    /// Next frame to be written, always in [0, capacity)
    write_pos: usize,
}

impl RingBuffer {
    /// Create a silent ring buffer holding `capacity` frames per channel
    ///
    /// A zero capacity is bumped to one frame so that modulo arithmetic on
    /// the cursor stays defined.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            left: vec![0.0; capacity].into_boxed_slice(),
            right: vec![0.0; capacity].into_boxed_slice(),
            write_pos: 0,
        }
    }

    /// Store a frame at the write cursor, then advance and wrap the cursor
    ///
    /// O(1) and allocation-free.
    #[inline]
    pub fn write(&mut self, left: Sample, right: Sample) {
        self.left[self.write_pos] = left;
        self.right[self.write_pos] = right;
        self.advance();
    }

    /// Store a frame at the write cursor without moving it
    ///
    /// The engine records the incoming frame, reads back through the
    /// trajectory (which may land on the frame just stored) and only then
    /// advances.
    #[inline]
    pub(crate) fn record(&mut self, left: Sample, right: Sample) {
        self.left[self.write_pos] = left;
        self.right[self.write_pos] = right;
    }

    /// Advance the write cursor by one frame
    #[inline]
    pub(crate) fn advance(&mut self) {
        self.write_pos += 1;
        if self.write_pos >= self.left.len() {
            self.write_pos = 0;
        }
    }

    /// Number of frames per channel (L)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Current write cursor
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    #[inline]
    pub fn left(&self) -> &[Sample] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[Sample] {
        &self.right
    }

    /// Wrap a signed frame offset into [0, capacity)
    #[inline]
    pub fn wrap(&self, position: i64) -> usize {
        position.rem_euclid(self.capacity() as i64) as usize
    }

    /// Silence both channels and rewind the cursor
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.write_pos = 0;
    }
}
