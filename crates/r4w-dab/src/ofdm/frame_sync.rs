//! Frame synchronization state
//!
//! The stage keeps one [`FrameState`] alive across invocations. The
//! frame-start flag that travels next to every symbol decides whether the
//! symbol counter restarts (and the offset is re-estimated) or advances.

use crate::geometry::SymbolGeometry;

use super::phase::delta_f;

/// Lock state of the coarse frequency stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    /// No frame start seen yet; offset is assumed to be zero
    #[default]
    AwaitingFirstFrame,
    /// At least one frame start seen; offset comes from the last estimate
    Locked,
}

/// What the synchronizer decided for the current symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEvent {
    /// The symbol opens a new frame and the offset must be re-estimated
    pub is_new_frame: bool,
}

/// Mutable per-stream state of the coarse frequency stage
///
/// Fields are public so a caller can start processing from any point of a
/// frame, for instance to resume a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameState {
    /// Symbols since the last frame start (0 on the frame-start symbol)
    pub symbol_index: u64,
    /// Last estimated window start, in `[0, fft_length - num_carriers)`
    pub frequency_offset: usize,
    /// Signed offset of the spectrum centre in bins
    pub delta_f: i64,
    /// Whether a frame start has been observed
    pub lock: LockState,
}

impl FrameState {
    /// State of a freshly configured stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one symbol
    ///
    /// A frame start restarts the symbol count; anything else increments it.
    pub fn on_symbol(&mut self, frame_start: bool) -> SyncEvent {
        if frame_start {
            self.symbol_index = 0;
        } else {
            self.symbol_index = self.symbol_index.wrapping_add(1);
        }
        SyncEvent {
            is_new_frame: frame_start,
        }
    }

    /// Record a fresh offset estimate for the frame that just started
    pub fn relock(&mut self, frequency_offset: usize, geometry: &SymbolGeometry) {
        self.frequency_offset = frequency_offset;
        self.delta_f = delta_f(frequency_offset, geometry);
        self.lock = LockState::Locked;
    }

    /// True once the first frame start has been processed
    pub fn is_locked(&self) -> bool {
        self.lock == LockState::Locked
    }
}
