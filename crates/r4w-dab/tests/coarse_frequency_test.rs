//! End-to-end tests for the coarse frequency correction stage.
//!
//! Symbols are synthesized in the frequency domain: random DQPSK carriers
//! placed at a known bin offset, with the cyclic-prefix phase ramp applied
//! the way a receiver sees it.

use std::f64::consts::{FRAC_PI_4, TAU};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use r4w_dab::{
    CoarseFrequencyCorrector, DabMode, DspError, FrameState, IQSample, NullObserver, OffsetReport,
    StreamRunner, SymbolGeometry,
};

/// Random unit-magnitude QPSK carriers, one per active subcarrier
fn random_carriers(rng: &mut StdRng, count: usize) -> Vec<IQSample> {
    (0..count)
        .map(|_| {
            let quadrant = rng.gen_range(0..4) as f64;
            let angle = FRAC_PI_4 + quadrant * TAU / 4.0;
            IQSample::new(angle.cos() as f32, angle.sin() as f32)
        })
        .collect()
}

/// Place carriers around an empty DC bin at `offset` and apply the phase
/// drift of symbol `index` within its frame
fn place(geometry: &SymbolGeometry, carriers: &[IQSample], offset: usize, index: u64) -> Vec<IQSample> {
    let df = offset as f64 + geometry.half_carriers() as f64 - (geometry.fft_length() / 2) as f64;
    let drift = TAU * df * geometry.cp_length() as f64 / geometry.fft_length() as f64 * index as f64;
    let drift = IQSample::new(drift.cos() as f32, drift.sin() as f32);

    let half = geometry.half_carriers();
    let mut symbol = vec![IQSample::new(0.0, 0.0); geometry.fft_length()];
    for (j, &c) in carriers.iter().enumerate() {
        let bin = if j < half { offset + j } else { offset + j + 1 };
        symbol[bin] = c * drift;
    }
    symbol
}

fn assert_close(got: &[IQSample], expected: &[IQSample], tol: f32, what: &str) {
    assert_eq!(got.len(), expected.len(), "{}: length", what);
    for (j, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!((g - e).norm() < tol, "{}: carrier {} got {} expected {}", what, j, g, e);
    }
}

#[test]
fn test_mode_i_unit_band_at_300() {
    let geometry = SymbolGeometry::from_mode(DabMode::I);
    let stage = CoarseFrequencyCorrector::configure(geometry).with_observer(NullObserver);
    let mut state = FrameState::new();

    let mut symbol = vec![IQSample::new(0.0, 0.0); 2048];
    for bin in 300..=300 + 1536 {
        if bin != 300 + 768 {
            symbol[bin] = IQSample::new(1.0, 0.0);
        }
    }

    let (out, flag) = stage.process(&mut state, &symbol, true).expect("process failed");
    assert!(flag);
    assert_eq!(state.frequency_offset, 300);
    assert_eq!(state.delta_f, 44);
    assert_eq!(state.symbol_index, 0);
    assert_eq!(r4w_dab::ofdm::rotation(&geometry, &state), IQSample::new(1.0, 0.0));
    assert_eq!(out.len(), 1536);
    assert!(out.iter().all(|&s| s == IQSample::new(1.0, 0.0)));
}

#[test]
fn test_corrects_phase_drift_across_frame() {
    let geometry = SymbolGeometry::from_mode(DabMode::I);
    let stage = CoarseFrequencyCorrector::configure(geometry).with_observer(NullObserver);
    let mut state = FrameState::new();
    let mut rng = StdRng::seed_from_u64(2024);
    let offset = 300;

    for index in 0..76u64 {
        let carriers = random_carriers(&mut rng, geometry.num_carriers());
        let symbol = place(&geometry, &carriers, offset, index);
        let (out, _) = stage.process(&mut state, &symbol, index == 0).unwrap();

        assert_eq!(state.symbol_index, index);
        assert_eq!(state.frequency_offset, offset);
        assert_close(&out, &carriers, 1e-3, &format!("symbol {}", index));
    }
}

#[test]
fn test_relock_on_new_frame() {
    let geometry = SymbolGeometry::from_mode(DabMode::II);
    let stage = CoarseFrequencyCorrector::configure(geometry).with_observer(NullObserver);
    let mut state = FrameState::new();
    let mut rng = StdRng::seed_from_u64(5);

    let carriers = random_carriers(&mut rng, geometry.num_carriers());
    stage.process(&mut state, &place(&geometry, &carriers, 64, 0), true).unwrap();
    for index in 1..10 {
        stage.process(&mut state, &place(&geometry, &carriers, 64, index), false).unwrap();
    }
    assert_eq!(state.frequency_offset, 64);
    assert_eq!(state.symbol_index, 9);

    // Tuner moved: the next frame starts at a different offset
    let carriers = random_carriers(&mut rng, geometry.num_carriers());
    let (out, _) = stage
        .process(&mut state, &place(&geometry, &carriers, 17, 0), true)
        .unwrap();
    assert_eq!(state.frequency_offset, 17);
    assert_eq!(state.delta_f, 17 + 192 - 256);
    assert_eq!(state.symbol_index, 0);
    assert_close(&out, &carriers, 1e-5, "relocked symbol");

    // Same result as a stage that never saw the first frame
    let mut fresh = FrameState::new();
    let (fresh_out, _) = stage
        .process(&mut fresh, &place(&geometry, &carriers, 17, 0), true)
        .unwrap();
    assert_eq!(fresh, state);
    assert_eq!(fresh_out, out);
}

#[test]
fn test_observer_sees_each_frame() {
    let geometry = SymbolGeometry::from_mode(DabMode::III);
    let reports: Arc<Mutex<Vec<OffsetReport>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let stage = CoarseFrequencyCorrector::configure(geometry)
        .with_observer(move |r: &OffsetReport| sink.lock().unwrap().push(*r));

    let mut rng = StdRng::seed_from_u64(9);
    let mut state = FrameState::new();
    for (frame, offset) in [3usize, 40, 32].into_iter().enumerate() {
        for index in 0..4u64 {
            let carriers = random_carriers(&mut rng, geometry.num_carriers());
            let symbol = place(&geometry, &carriers, offset, index);
            stage.process(&mut state, &symbol, index == 0).unwrap();
        }
        assert_eq!(reports.lock().unwrap().len(), frame + 1);
    }

    let offsets: Vec<usize> = reports.lock().unwrap().iter().map(|r| r.frequency_offset).collect();
    assert_eq!(offsets, vec![3, 40, 32]);
    let centred = reports.lock().unwrap()[2];
    assert_eq!(centred.delta_f, 0);
    assert!((centred.peak_energy - 192.0).abs() < 1e-3);
}

#[test]
fn test_stream_runner_over_blocks() {
    let geometry = SymbolGeometry::from_mode(DabMode::IV);
    let stage = CoarseFrequencyCorrector::configure(geometry).with_observer(NullObserver);
    let mut runner = StreamRunner::new(stage);
    let mut rng = StdRng::seed_from_u64(77);

    let mut input = Vec::new();
    let mut flags = Vec::new();
    let mut expected = Vec::new();
    for index in 0..12u64 {
        let frame_index = index % 6;
        let carriers = random_carriers(&mut rng, geometry.num_carriers());
        input.extend(place(&geometry, &carriers, 200, frame_index));
        flags.push(frame_index == 0);
        expected.extend(carriers);
    }

    let mut out = Vec::new();
    let mut flags_out = Vec::new();
    // Two scheduler calls of unequal size
    let split = 5 * geometry.fft_length();
    runner.work(&input[..split], &flags[..5], &mut out, &mut flags_out).unwrap();
    runner.work(&input[split..], &flags[5..], &mut out, &mut flags_out).unwrap();

    assert_eq!(flags_out, flags);
    assert_eq!(runner.items_processed(), 12);
    assert_eq!(runner.state().frequency_offset, 200);
    assert_eq!(runner.state().symbol_index, 5);
    assert_close(&out, &expected, 1e-3, "stream output");
}

#[test]
fn test_malformed_symbol_fails_loudly() {
    let geometry = SymbolGeometry::from_mode(DabMode::III);
    let stage = CoarseFrequencyCorrector::configure(geometry).with_observer(NullObserver);
    let mut state = FrameState::new();

    let short = vec![IQSample::new(1.0, 0.0); 255];
    assert_eq!(
        stage.process(&mut state, &short, true),
        Err(DspError::SymbolLength { expected: 256, actual: 255 })
    );
    assert_eq!(state, FrameState::new());
}
