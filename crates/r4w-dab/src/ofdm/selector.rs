//! Active subcarrier extraction
//!
//! Copies the `num_carriers` active bins out of a full FFT symbol, starting
//! at the estimated offset, skipping the DC bin and applying the common
//! phase rotation on the way.

use crate::geometry::SymbolGeometry;
use crate::types::{check_symbol_len, DspError, DspResult, IQSample};

/// Write the rotated active carriers of `symbol` into `out`
///
/// `out[j] = symbol[offset + j] · rotation` for the lower half and
/// `out[j] = symbol[offset + j + 1] · rotation` for the upper half, so the
/// DC bin at `offset + num_carriers / 2` never reaches the output.
pub fn select_into(
    symbol: &[IQSample],
    frequency_offset: usize,
    rotation: IQSample,
    geometry: &SymbolGeometry,
    out: &mut [IQSample],
) -> DspResult<()> {
    check_symbol_len(symbol, geometry.fft_length())?;
    if out.len() != geometry.num_carriers() {
        return Err(DspError::OutputLength {
            expected: geometry.num_carriers(),
            actual: out.len(),
        });
    }
    if frequency_offset >= geometry.search_span() {
        return Err(DspError::OffsetOutOfRange {
            offset: frequency_offset,
            span: geometry.search_span(),
        });
    }

    let half = geometry.half_carriers();
    let (lower, upper) = out.split_at_mut(half);
    let lower_src = &symbol[frequency_offset..frequency_offset + half];
    let upper_src = &symbol[frequency_offset + half + 1..=frequency_offset + geometry.num_carriers()];

    for (dst, &src) in lower.iter_mut().zip(lower_src) {
        *dst = src * rotation;
    }
    for (dst, &src) in upper.iter_mut().zip(upper_src) {
        *dst = src * rotation;
    }
    Ok(())
}

/// Allocating variant of [`select_into`]
pub fn select(
    symbol: &[IQSample],
    frequency_offset: usize,
    rotation: IQSample,
    geometry: &SymbolGeometry,
) -> DspResult<Vec<IQSample>> {
    let mut out = vec![IQSample::new(0.0, 0.0); geometry.num_carriers()];
    select_into(symbol, frequency_offset, rotation, geometry, &mut out)?;
    Ok(out)
}
