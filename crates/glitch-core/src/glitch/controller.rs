//! Mode selection, freeze capture and the lock-free control handoff
//!
//! The control surface (UI thread, MIDI handler, stdin reader) never touches
//! the engine. It writes mode requests into [`GlitchAtomics`] through a
//! [`ModeHandle`]; the audio thread polls them once per frame and applies
//! them in its [`ModeController`], which is the only place the freeze point
//! changes.
//!
//! # Request encoding
//!
//! A request is packed into one `AtomicU64` as `(generation << 8) | mode`.
//! The generation increments on every accepted request, so the audio thread
//! can tell "same mode, nothing happened" apart from "released and pressed
//! again between two polls". In the latter case the mode is re-entered with
//! a fresh freeze point, exactly as if both transitions had been observed.
//!
//! ```text
//! ┌──────────────────┐   press()/release()   ┌──────────────────────┐
//! │  Control surface │──────────────────────►│ GlitchAtomics.request│
//! └──────────────────┘   (CAS, never blocks) └──────────┬───────────┘
//!          ▲                                            │ poll() every frame
//!          │ Relaxed loads                              ▼
//! ┌──────────────────┐     publish()         ┌──────────────────────┐
//! │ active/freeze/w  │◄──────────────────────│ ModeController       │
//! └──────────────────┘                       │ (audio thread)       │
//!                                            └──────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use super::mode::GlitchMode;
use super::trajectory::Cursor;

const MODE_MASK: u64 = 0xFF;
const GENERATION_SHIFT: u32 = 8;

/// Lock-free glitch state shared between the control surface and the audio thread
pub struct GlitchAtomics {
    /// Latest requested mode, packed with its generation
    request: AtomicU64,
    /// Mode the audio thread is currently rendering
    active_mode: AtomicU8,
    /// Freeze point of the active mode
    freeze_pos: AtomicU64,
    /// Write cursor at the end of the last processed block
    write_pos: AtomicU64,
}

impl GlitchAtomics {
    /// Create new atomic state (Clean, generation 0)
    pub fn new() -> Self {
        Self {
            request: AtomicU64::new(Self::pack(0, GlitchMode::Clean)),
            active_mode: AtomicU8::new(GlitchMode::Clean.index()),
            freeze_pos: AtomicU64::new(0),
            write_pos: AtomicU64::new(0),
        }
    }

    /// Pack a generation counter and a mode into a single u64
    #[inline]
    pub fn pack(generation: u64, mode: GlitchMode) -> u64 {
        (generation << GENERATION_SHIFT) | mode.index() as u64
    }

    /// Split a packed request into (generation, mode)
    ///
    /// An out-of-range mode byte decodes as Clean.
    #[inline]
    pub fn unpack(packed: u64) -> (u64, GlitchMode) {
        let mode = GlitchMode::from_index((packed & MODE_MASK) as u8).unwrap_or_default();
        (packed >> GENERATION_SHIFT, mode)
    }

    /// Latest request as (generation, mode)
    #[inline]
    pub fn requested(&self) -> (u64, GlitchMode) {
        Self::unpack(self.request.load(Ordering::Acquire))
    }

    /// Request `mode`; returns false if it is already the pending request
    pub fn request(&self, mode: GlitchMode) -> bool {
        let mut current = self.request.load(Ordering::Acquire);
        loop {
            let (generation, pending) = Self::unpack(current);
            if pending == mode {
                return false;
            }
            let next = Self::pack(generation.wrapping_add(1), mode);
            match self.request.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Request Clean, but only if `mode` is the pending request
    ///
    /// Used for "pointer left the pad": leaving a pad that is not held must
    /// not cancel another one.
    pub fn release_if(&self, mode: GlitchMode) -> bool {
        let mut current = self.request.load(Ordering::Acquire);
        loop {
            let (generation, pending) = Self::unpack(current);
            if pending != mode || pending.is_clean() {
                return false;
            }
            let next = Self::pack(generation.wrapping_add(1), GlitchMode::Clean);
            match self.request.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Mode the audio thread is rendering (lock-free)
    #[inline]
    pub fn active_mode(&self) -> GlitchMode {
        GlitchMode::from_index(self.active_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Freeze point of the active mode (lock-free)
    #[inline]
    pub fn freeze_pos(&self) -> u64 {
        self.freeze_pos.load(Ordering::Relaxed)
    }

    /// Write cursor as of the last processed block (lock-free)
    #[inline]
    pub fn write_pos(&self) -> u64 {
        self.write_pos.load(Ordering::Relaxed)
    }

    /// Publish audio-thread state for readers
    #[inline]
    pub(crate) fn publish(&self, mode: GlitchMode, freeze_pos: usize, write_pos: usize) {
        self.active_mode.store(mode.index(), Ordering::Relaxed);
        self.freeze_pos.store(freeze_pos as u64, Ordering::Relaxed);
        self.write_pos.store(write_pos as u64, Ordering::Relaxed);
    }
}

impl Default for GlitchAtomics {
    fn default() -> Self {
        Self::new()
    }
}

/// Control-surface handle for a running engine
///
/// Cheap to clone and safe to use from any thread. Every call is a handful
/// of atomic operations and never blocks the audio thread.
#[derive(Clone)]
pub struct ModeHandle {
    atomics: Arc<GlitchAtomics>,
}

impl ModeHandle {
    pub fn new(atomics: Arc<GlitchAtomics>) -> Self {
        Self { atomics }
    }

    /// Pad pressed: start glitching with `mode`
    pub fn press(&self, mode: GlitchMode) {
        if self.atomics.request(mode) {
            log::debug!("glitch: press {}", mode);
        }
    }

    /// Pad released: back to Clean
    pub fn release(&self) {
        if self.atomics.request(GlitchMode::Clean) {
            log::debug!("glitch: release");
        }
    }

    /// Release only if `mode` is the one being held
    pub fn release_mode(&self, mode: GlitchMode) -> bool {
        let released = self.atomics.release_if(mode);
        if released {
            log::debug!("glitch: release {}", mode);
        }
        released
    }

    /// Request a mode by its integer id (0 releases)
    ///
    /// Returns false and leaves the request untouched for ids outside 0-11.
    pub fn set_mode_id(&self, id: u8) -> bool {
        match GlitchMode::from_index(id) {
            Some(mode) => {
                self.press(mode);
                true
            }
            None => {
                log::warn!("glitch: ignoring unknown mode id {}", id);
                false
            }
        }
    }

    /// Most recently requested mode (may not be rendered yet)
    pub fn requested_mode(&self) -> GlitchMode {
        self.atomics.requested().1
    }

    /// Mode currently being rendered
    pub fn active_mode(&self) -> GlitchMode {
        self.atomics.active_mode()
    }

    pub fn freeze_point(&self) -> u64 {
        self.atomics.freeze_pos()
    }

    pub fn write_pos(&self) -> u64 {
        self.atomics.write_pos()
    }
}

/// Audio-thread mode state machine
///
/// Owns the active mode, its freeze point and the unwrapped frame count
/// since the freeze. Never logs; transitions reach readers through
/// [`GlitchAtomics`] and are logged by [`ModeHandle`] on the control side.
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    mode: GlitchMode,
    freeze_pos: usize,
    elapsed: u64,
    /// Generation of the last request applied from the atomics
    last_generation: u64,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mode(&self) -> GlitchMode {
        self.mode
    }

    #[inline]
    pub fn freeze_pos(&self) -> usize {
        self.freeze_pos
    }

    /// Frames processed since the last freeze
    #[inline]
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Switch to `mode`, snapshotting `write_pos` as the freeze point
    ///
    /// Selecting the active mode again is a no-op and keeps the freeze point.
    /// Switching to Clean leaves the freeze point where it was.
    /// Returns true if the mode changed.
    pub fn activate(&mut self, mode: GlitchMode, write_pos: usize) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        if !mode.is_clean() {
            self.freeze_pos = write_pos;
            self.elapsed = 0;
        }
        true
    }

    /// Leave and re-enter the active mode, refreezing at `write_pos`
    pub fn retrigger(&mut self, write_pos: usize) {
        let mode = self.mode;
        self.activate(GlitchMode::Clean, write_pos);
        self.activate(mode, write_pos);
    }

    /// Apply any new request from the control surface
    ///
    /// Returns true if the mode or freeze point changed.
    #[inline]
    pub fn poll(&mut self, atomics: &GlitchAtomics, write_pos: usize) -> bool {
        let (generation, mode) = atomics.requested();
        if generation == self.last_generation {
            return false;
        }
        self.last_generation = generation;

        if mode == self.mode {
            // Requests came and went between two polls (e.g. release + press)
            if mode.is_clean() {
                return false;
            }
            self.retrigger(write_pos);
            return true;
        }
        self.activate(mode, write_pos)
    }

    /// Count one processed frame
    #[inline]
    pub fn tick(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
    }

    /// Cursor for the trajectory of the frame at `write_pos`
    #[inline]
    pub fn cursor(&self, write_pos: usize) -> Cursor {
        Cursor {
            write_pos,
            freeze_pos: self.freeze_pos,
            elapsed: self.elapsed,
        }
    }
}
