//! Traffic and fault counters for the controller
//!
//! Lock-free atomics, shared via `Arc` and readable while the loop runs.
//! Frame faults are counted regardless of the configured fault policy, so a
//! silent policy never hides corruption entirely.

use std::sync::atomic::{AtomicU64, Ordering};

/// Controller statistics (fully lock-free)
#[derive(Debug, Default)]
pub struct Stats {
    /// Frames successfully decoded and dispatched
    frames_rx: AtomicU64,
    /// Frames encoded and handed to the serial writer
    frames_tx: AtomicU64,
    /// Chunks that failed to unstuff or decode
    frame_faults: AtomicU64,
    /// Errors returned by adaptor `handle_frame` calls
    adaptor_errors: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_frame_rx(&self) {
        self.frames_rx.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_frame_tx(&self) {
        self.frames_tx.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_frame_fault(&self) {
        self.frame_faults.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_adaptor_error(&self) {
        self.adaptor_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_rx(&self) -> u64 {
        self.frames_rx.load(Ordering::Relaxed)
    }

    pub fn frames_tx(&self) -> u64 {
        self.frames_tx.load(Ordering::Relaxed)
    }

    pub fn frame_faults(&self) -> u64 {
        self.frame_faults.load(Ordering::Relaxed)
    }

    pub fn adaptor_errors(&self) -> u64 {
        self.adaptor_errors.load(Ordering::Relaxed)
    }
}
