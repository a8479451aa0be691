//! Cyclic-prefix phase drift compensation
//!
//! Removing the cyclic prefix from a signal that sits `delta_f` bins away
//! from the band centre advances the phase of every following symbol by
//! `2π·delta_f·cp_length/fft_length`. The ramp starts over at each frame
//! start, so one closed-form rotation per symbol cancels it.
//!
//! Only the common rotation is removed here. Per-carrier phase is left to
//! the differential demodulator downstream, which ignores it.

use std::f64::consts::TAU;

use crate::geometry::SymbolGeometry;
use crate::types::IQSample;

use super::frame_sync::FrameState;

/// Signed offset of the spectrum centre for a window start, in bins
pub fn delta_f(frequency_offset: usize, geometry: &SymbolGeometry) -> i64 {
    frequency_offset as i64 + geometry.half_carriers() as i64 - (geometry.fft_length() / 2) as i64
}

/// Residue of `delta_f · cp_length · symbol_index` modulo `fft_length`
///
/// The angle only matters modulo 2π, so the product is reduced with integer
/// arithmetic before any float conversion.
fn phase_steps(delta_f: i64, cp_length: usize, symbol_index: u64, fft_length: usize) -> u64 {
    let n = fft_length as i128;
    let per_symbol = (delta_f as i128 * cp_length as i128).rem_euclid(n);
    let symbols = symbol_index as i128 % n;
    ((per_symbol * symbols) % n) as u64
}

/// Rotation angle in radians for the current symbol, in `(-2π, 0]`
pub fn rotation_angle(geometry: &SymbolGeometry, state: &FrameState) -> f64 {
    let steps = phase_steps(
        state.delta_f,
        geometry.cp_length(),
        state.symbol_index,
        geometry.fft_length(),
    );
    -TAU * steps as f64 / geometry.fft_length() as f64
}

/// Unit-magnitude rotation applied to every carrier of the current symbol
pub fn rotation(geometry: &SymbolGeometry, state: &FrameState) -> IQSample {
    let angle = rotation_angle(geometry, state);
    IQSample::new(angle.cos() as f32, angle.sin() as f32)
}
