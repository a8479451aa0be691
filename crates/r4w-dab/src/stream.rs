//! Adapter between vector stages and a flat-buffer scheduler
//!
//! Stream schedulers hand a block `n` vectors at once, laid end to end in
//! one buffer, with a parallel side channel carrying one flag per vector.
//! [`StreamRunner`] slices such buffers into single invocations of a
//! [`VectorStage`] and keeps the stage state between calls.

use tracing::trace;

use crate::types::{DspError, DspResult, IQSample};

/// A stage that maps one fixed-size input vector (plus a flag) to one
/// fixed-size output vector (plus a flag)
pub trait VectorStage {
    /// State carried from one invocation to the next
    type State;

    /// Samples per input vector
    fn input_len(&self) -> usize;

    /// Samples per output vector
    fn output_len(&self) -> usize;

    /// State before the first vector
    fn initial_state(&self) -> Self::State;

    /// Process exactly one vector
    fn process_into(
        &self,
        state: &mut Self::State,
        input: &[IQSample],
        flag: bool,
        output: &mut [IQSample],
    ) -> DspResult<bool>;
}

/// Drives a [`VectorStage`] over blocks of vectors
#[derive(Debug)]
pub struct StreamRunner<S: VectorStage> {
    stage: S,
    state: S::State,
    items: u64,
}

impl<S: VectorStage> StreamRunner<S> {
    /// Wrap a stage, starting from its initial state
    pub fn new(stage: S) -> Self {
        let state = stage.initial_state();
        Self {
            stage,
            state,
            items: 0,
        }
    }

    /// The wrapped stage
    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Current stage state
    pub fn state(&self) -> &S::State {
        &self.state
    }

    /// Vectors processed so far
    pub fn items_processed(&self) -> u64 {
        self.items
    }

    /// Process every vector in `input`, appending to `output` and `flags_out`
    ///
    /// `input` must hold a whole number of vectors and exactly one flag per
    /// vector. Returns the number of vectors produced. If the stage fails
    /// part way, outputs of the vectors already processed are kept.
    pub fn work(
        &mut self,
        input: &[IQSample],
        flags: &[bool],
        output: &mut Vec<IQSample>,
        flags_out: &mut Vec<bool>,
    ) -> DspResult<usize> {
        let in_len = self.stage.input_len();
        let out_len = self.stage.output_len();

        let remainder = input.len() % in_len;
        if remainder != 0 {
            return Err(DspError::SymbolLength {
                expected: in_len,
                actual: remainder,
            });
        }
        let n = input.len() / in_len;
        if flags.len() != n {
            return Err(DspError::FlagCount {
                expected: n,
                actual: flags.len(),
            });
        }

        let base = output.len();
        output.resize(base + n * out_len, IQSample::new(0.0, 0.0));
        flags_out.reserve(n);

        let vectors = input.chunks_exact(in_len).zip(flags);
        for (i, (vector, &flag)) in vectors.enumerate() {
            let dst = &mut output[base + i * out_len..base + (i + 1) * out_len];
            match self.stage.process_into(&mut self.state, vector, flag, dst) {
                Ok(flag_out) => flags_out.push(flag_out),
                Err(e) => {
                    output.truncate(base + i * out_len);
                    return Err(e);
                }
            }
            self.items += 1;
        }

        trace!(vectors = n, total = self.items, "work");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sums pairs of samples and counts vectors since the last flag
    struct PairSum;

    impl VectorStage for PairSum {
        type State = u32;

        fn input_len(&self) -> usize {
            2
        }

        fn output_len(&self) -> usize {
            1
        }

        fn initial_state(&self) -> u32 {
            0
        }

        fn process_into(
            &self,
            state: &mut u32,
            input: &[IQSample],
            flag: bool,
            output: &mut [IQSample],
        ) -> DspResult<bool> {
            *state = if flag { 0 } else { *state + 1 };
            output[0] = input[0] + input[1];
            Ok(flag)
        }
    }

    fn samples(values: &[f32]) -> Vec<IQSample> {
        values.iter().map(|&v| IQSample::new(v, 0.0)).collect()
    }

    #[test]
    fn test_work_processes_each_vector() {
        let mut runner = StreamRunner::new(PairSum);
        let mut out = Vec::new();
        let mut flags_out = Vec::new();

        let n = runner
            .work(&samples(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), &[true, false, false], &mut out, &mut flags_out)
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, samples(&[3.0, 7.0, 11.0]));
        assert_eq!(flags_out, vec![true, false, false]);
        assert_eq!(*runner.state(), 2);

        // State carries over into the next block
        runner.work(&samples(&[0.0, 1.0]), &[false], &mut out, &mut flags_out).unwrap();
        assert_eq!(*runner.state(), 3);
        assert_eq!(runner.items_processed(), 4);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_work_rejects_partial_vectors() {
        let mut runner = StreamRunner::new(PairSum);
        let err = runner.work(&samples(&[1.0, 2.0, 3.0]), &[true], &mut Vec::new(), &mut Vec::new());
        assert_eq!(err, Err(DspError::SymbolLength { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_work_rejects_flag_mismatch() {
        let mut runner = StreamRunner::new(PairSum);
        let err = runner.work(&samples(&[1.0, 2.0]), &[true, false], &mut Vec::new(), &mut Vec::new());
        assert_eq!(err, Err(DspError::FlagCount { expected: 1, actual: 2 }));
        assert_eq!(runner.items_processed(), 0);
    }
}
