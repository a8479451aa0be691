//! # DAB Receiver Stages
//!
//! Streaming signal-processing stages for a DAB (Digital Audio Broadcasting,
//! ETSI EN 300 401) OFDM receiver. Each stage consumes one fixed-size vector
//! per invocation together with a frame-start flag and produces one
//! transformed vector plus the propagated flag.
//!
//! ## Coarse Frequency Correction
//!
//! After the FFT, the active band of a DAB symbol can sit anywhere in the
//! FFT output if the tuner is off by whole subcarriers. The
//! [`CoarseFrequencyCorrector`] stage:
//!
//! - estimates the integer offset once per frame by energy correlation
//! - counts symbols since the frame start
//! - removes the phase ramp that cyclic prefix removal introduces at an offset
//! - emits the `num_carriers` active carriers with the DC carrier dropped
//!
//! ## Signal Flow
//!
//! ```text
//! FFT symbol (fft_length) ─► CoarseFrequencyCorrector ─► carriers (num_carriers) ─► diff phasor ─► ...
//!         frame_start ──────────────────┴──────────────► frame_start
//! ```
//!
//! ## Example
//!
//! ```rust
//! use r4w_dab::{CoarseFrequencyCorrector, DabMode, FrameState, IQSample, SymbolGeometry};
//!
//! let geometry = SymbolGeometry::from_mode(DabMode::I);
//! let stage = CoarseFrequencyCorrector::configure(geometry);
//! let mut state = FrameState::new();
//!
//! // Active band starts 300 bins into the FFT output
//! let mut symbol = vec![IQSample::new(0.0, 0.0); 2048];
//! for k in (0..=1536).filter(|&k| k != 768) {
//!     symbol[300 + k] = IQSample::new(1.0, 0.0);
//! }
//!
//! let (carriers, frame_start) = stage.process(&mut state, &symbol, true).unwrap();
//! assert_eq!(state.frequency_offset, 300);
//! assert_eq!(state.delta_f, 44);
//! assert_eq!(carriers.len(), 1536);
//! assert!(frame_start);
//! ```

pub mod geometry;
pub mod interleave;
pub mod observe;
pub mod ofdm;
pub mod stream;
pub mod types;

// Re-export main types
pub use geometry::{DabMode, GeometryConfig, SymbolGeometry};
pub use observe::{ChannelObserver, NullObserver, OffsetObserver, OffsetReport, TracingObserver};
pub use ofdm::{CoarseFrequencyCorrector, FrameState, LockState};
pub use stream::{StreamRunner, VectorStage};
pub use types::{DspError, DspResult, IQSample};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::geometry::{DabMode, SymbolGeometry};
    pub use crate::observe::{OffsetObserver, OffsetReport};
    pub use crate::ofdm::{CoarseFrequencyCorrector, FrameState};
    pub use crate::stream::{StreamRunner, VectorStage};
    pub use crate::types::{DspError, DspResult, IQSample};
}
