//! Coarse frequency correction stage
//!
//! Per symbol:
//!
//! ```text
//! symbol, frame_start ─► FrameState::on_symbol ─┬─ new frame ─► estimate_offset ─► relock ─► observer
//!                                               └──────────────────────────────────┐
//!                                                                                  ▼
//!                             output, frame_start ◄─ select_into ◄─ rotation(geometry, state)
//! ```
//!
//! The stage itself is immutable after configuration; everything that
//! changes from symbol to symbol lives in the caller-owned [`FrameState`].

use std::fmt;

use tracing::debug;

use crate::geometry::SymbolGeometry;
use crate::observe::{OffsetObserver, OffsetReport, TracingObserver};
use crate::stream::VectorStage;
use crate::types::{check_symbol_len, DspError, DspResult, IQSample};

use super::energy::estimate_offset;
use super::frame_sync::FrameState;
use super::phase::rotation;
use super::selector::select_into;

/// Estimates and removes the integer subcarrier offset of DAB symbols
pub struct CoarseFrequencyCorrector {
    geometry: SymbolGeometry,
    observer: Box<dyn OffsetObserver>,
}

impl CoarseFrequencyCorrector {
    /// Configure a stage for `geometry`, reporting offsets through `tracing`
    pub fn configure(geometry: SymbolGeometry) -> Self {
        Self {
            geometry,
            observer: Box::new(TracingObserver),
        }
    }

    /// Validate raw lengths and configure a stage
    pub fn new(fft_length: usize, num_carriers: usize, cp_length: usize) -> DspResult<Self> {
        Ok(Self::configure(SymbolGeometry::new(fft_length, num_carriers, cp_length)?))
    }

    /// Replace the diagnostic sink
    pub fn with_observer(mut self, observer: impl OffsetObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Geometry this stage was configured with
    pub fn geometry(&self) -> &SymbolGeometry {
        &self.geometry
    }

    /// Correct one symbol into a caller-provided buffer
    ///
    /// Returns the frame-start flag for the output side channel, which is
    /// always the input flag. On error `state` is left untouched.
    pub fn process_into(
        &self,
        state: &mut FrameState,
        symbol: &[IQSample],
        frame_start: bool,
        out: &mut [IQSample],
    ) -> DspResult<bool> {
        let geometry = &self.geometry;
        check_symbol_len(symbol, geometry.fft_length())?;
        if out.len() != geometry.num_carriers() {
            return Err(DspError::OutputLength {
                expected: geometry.num_carriers(),
                actual: out.len(),
            });
        }
        // A frame start replaces the offset; otherwise the held one must be usable
        if !frame_start && state.frequency_offset >= geometry.search_span() {
            return Err(DspError::OffsetOutOfRange {
                offset: state.frequency_offset,
                span: geometry.search_span(),
            });
        }

        let event = state.on_symbol(frame_start);
        if event.is_new_frame {
            let estimate = estimate_offset(symbol, geometry)?;
            let was_locked = state.is_locked();
            state.relock(estimate.offset, geometry);

            debug!(
                offset = state.frequency_offset,
                delta_f = state.delta_f,
                relock = was_locked,
                "frame start"
            );
            self.observer.on_offset(&OffsetReport {
                frequency_offset: state.frequency_offset,
                delta_f: state.delta_f,
                peak_energy: estimate.energy,
            });
        }

        let correction = rotation(geometry, state);
        select_into(symbol, state.frequency_offset, correction, geometry, out)?;
        Ok(frame_start)
    }

    /// Correct one symbol, allocating the output vector
    pub fn process(
        &self,
        state: &mut FrameState,
        symbol: &[IQSample],
        frame_start: bool,
    ) -> DspResult<(Vec<IQSample>, bool)> {
        let mut out = vec![IQSample::new(0.0, 0.0); self.geometry.num_carriers()];
        let flag = self.process_into(state, symbol, frame_start, &mut out)?;
        Ok((out, flag))
    }
}

impl fmt::Debug for CoarseFrequencyCorrector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoarseFrequencyCorrector")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

impl VectorStage for CoarseFrequencyCorrector {
    type State = FrameState;

    fn input_len(&self) -> usize {
        self.geometry.fft_length()
    }

    fn output_len(&self) -> usize {
        self.geometry.num_carriers()
    }

    fn initial_state(&self) -> FrameState {
        FrameState::new()
    }

    fn process_into(
        &self,
        state: &mut FrameState,
        input: &[IQSample],
        flag: bool,
        output: &mut [IQSample],
    ) -> DspResult<bool> {
        CoarseFrequencyCorrector::process_into(self, state, input, flag, output)
    }
}
