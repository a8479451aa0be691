//! Complex vector to split real/imaginary floats
//!
//! The DQPSK soft-bit path downstream of the OFDM stages consumes each
//! carrier vector as `n` real parts followed by `n` imaginary parts:
//!
//! ```text
//! [re_0, re_1, ..., re_{n-1}, im_0, im_1, ..., im_{n-1}]
//! ```

use crate::types::IQSample;

/// Append the split-float layout of one vector to `out`
pub fn complex_to_split_f32(vector: &[IQSample], out: &mut Vec<f32>) {
    out.reserve(vector.len() * 2);
    out.extend(vector.iter().map(|s| s.re));
    out.extend(vector.iter().map(|s| s.im));
}

/// Convert a buffer of consecutive `vector_len` vectors
///
/// A trailing partial vector is ignored.
pub fn vectors_to_split_f32(samples: &[IQSample], vector_len: usize) -> Vec<f32> {
    if vector_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(samples.len() / vector_len * vector_len * 2);
    for vector in samples.chunks_exact(vector_len) {
        complex_to_split_f32(vector, &mut out);
    }
    out
}
