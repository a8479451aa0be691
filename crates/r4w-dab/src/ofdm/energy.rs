//! Energy-correlation coarse frequency offset estimator
//!
//! DAB leaves the centre carrier empty, so the active band of a received
//! symbol is `num_carriers + 1` bins wide with a hole in the middle. The
//! integer offset of that band inside the FFT output is the window start
//! that captures the most energy, counting every bin of the window except
//! the DC hole.
//!
//! Only the first window is summed in full. Each later window is derived from
//! its predecessor with four terms:
//!
//! ```text
//!   E(i) = E(i-1) - |x[i-1]|²              bin leaving on the left
//!                 + |x[i + nc/2 - 1]|²      old DC hole becomes active
//!                 - |x[i + nc/2]|²          new DC hole
//!                 + |x[i + nc]|²            bin entering on the right
//! ```
//!
//! which turns an O(n²) search into a single O(fft_length) pass.

use crate::geometry::SymbolGeometry;
use crate::types::{check_symbol_len, DspResult, IQSample};

/// Magnitude squared of one bin, computed at sample precision
#[inline]
fn mag_squared(sample: IQSample) -> f64 {
    sample.norm_sqr() as f64
}

/// Walk every window position, handing `(start, energy)` to `visit`
///
/// Energies are accumulated in f64.
fn scan_windows(symbol: &[IQSample], geometry: &SymbolGeometry, mut visit: impl FnMut(usize, f64)) {
    let nc = geometry.num_carriers();
    let dc = geometry.dc_offset();

    let mut sum: f64 = symbol[..=nc]
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != dc)
        .map(|(_, &s)| mag_squared(s))
        .sum();
    visit(0, sum);

    for i in 1..geometry.search_span() {
        sum -= mag_squared(symbol[i - 1]);
        sum += mag_squared(symbol[i + dc - 1]);
        sum -= mag_squared(symbol[i + dc]);
        sum += mag_squared(symbol[i + nc]);
        visit(i, sum);
    }
}

/// Result of one offset search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetEstimate {
    /// Window start with the highest energy, in `[0, fft_length - num_carriers)`
    pub offset: usize,
    /// Energy captured by that window
    pub energy: f64,
}

/// Estimate the integer subcarrier offset of a symbol
///
/// Ties resolve to the smallest window start: a later window only wins when
/// its energy is strictly greater.
pub fn estimate_offset(symbol: &[IQSample], geometry: &SymbolGeometry) -> DspResult<OffsetEstimate> {
    check_symbol_len(symbol, geometry.fft_length())?;

    let mut best = OffsetEstimate {
        offset: 0,
        energy: f64::NEG_INFINITY,
    };
    scan_windows(symbol, geometry, |i, energy| {
        if energy > best.energy {
            best = OffsetEstimate { offset: i, energy };
        }
    });
    Ok(best)
}

/// Energy of every candidate window, from the incremental recurrence
pub fn energy_profile(symbol: &[IQSample], geometry: &SymbolGeometry) -> DspResult<Vec<f64>> {
    check_symbol_len(symbol, geometry.fft_length())?;

    let mut profile = Vec::with_capacity(geometry.search_span());
    scan_windows(symbol, geometry, |_, energy| profile.push(energy));
    Ok(profile)
}

/// Energy of the window starting at `start`, summed from scratch
///
/// Reference for the incremental search. `start` must be below
/// `search_span()` and `symbol` must hold a full symbol.
pub fn window_energy(symbol: &[IQSample], geometry: &SymbolGeometry, start: usize) -> f64 {
    let dc = geometry.dc_offset();
    (0..=geometry.num_carriers())
        .filter(|&k| k != dc)
        .map(|k| mag_squared(symbol[start + k]))
        .sum()
}
