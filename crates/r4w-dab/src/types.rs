//! Core types for DAB receiver stages
//!
//! Frequency-domain OFDM symbols travel between stages as vectors of
//! single-precision complex samples, the same layout the front end and the
//! sample files use. Anything that accumulates over a whole symbol (energy
//! sums, phase angles) is computed in double precision.
//!
//! ```text
//!   symbol (fft_length bins)
//!   +-------+---------------------+---+---------------------+-------+
//!   | zeros |  num_carriers / 2   |DC |  num_carriers / 2   | zeros |
//!   +-------+---------------------+---+---------------------+-------+
//!           ^ frequency_offset
//! ```

use num_complex::Complex32;

/// A single frequency-domain sample (one subcarrier bin)
pub type IQSample = Complex32;

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;

/// Errors raised at the boundary of a receiver stage
///
/// Configuration errors are caught when a stage is built. Length errors are
/// contract violations by the caller and abort the current invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DspError {
    #[error("{field} must be positive")]
    ZeroLength { field: &'static str },

    #[error("num_carriers ({num_carriers}) must be smaller than fft_length ({fft_length})")]
    CarriersExceedFft {
        num_carriers: usize,
        fft_length: usize,
    },

    #[error("num_carriers must be even, got {0}")]
    OddCarrierCount(usize),

    #[error("symbol length mismatch: expected {expected}, got {actual}")]
    SymbolLength { expected: usize, actual: usize },

    #[error("frame flag count mismatch: expected {expected}, got {actual}")]
    FlagCount { expected: usize, actual: usize },

    #[error("frequency offset {offset} outside search span 0..{span}")]
    OffsetOutOfRange { offset: usize, span: usize },

    #[error("output buffer length mismatch: expected {expected}, got {actual}")]
    OutputLength { expected: usize, actual: usize },
}

/// Check that a buffer holds exactly one symbol of `expected` samples
pub(crate) fn check_symbol_len(symbol: &[IQSample], expected: usize) -> DspResult<()> {
    if symbol.len() != expected {
        return Err(DspError::SymbolLength {
            expected,
            actual: symbol.len(),
        });
    }
    Ok(())
}
