//! DAB Receiver Stage Command-Line Interface
//!
//! This CLI provides tools for:
//! - Inspecting DAB OFDM symbol geometries
//! - Simulating coarse frequency offsets and checking the correction stage
//! - Running the correction stage over captured FFT symbol files
//!
//! Sample files hold little-endian `f32` I/Q pairs, one FFT symbol after
//! another. Flag files hold one byte per symbol, non-zero on frame starts.

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use clap::{Parser, Subcommand};
use r4w_dab::interleave::vectors_to_split_f32;
use r4w_dab::observe::{ChannelObserver, OffsetObserver, OffsetReport, TracingObserver};
use r4w_dab::{CoarseFrequencyCorrector, DabMode, FrameState, IQSample, StreamRunner, SymbolGeometry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::f64::consts::TAU;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "r4w-dab")]
#[command(author, version, about = "DAB receiver stage CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show symbol geometry for a DAB mode or config file
    Info {
        /// DAB transmission mode (I, II, III, IV)
        #[arg(long, default_value = "I")]
        mode: String,

        /// JSON geometry file (overrides --mode)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Simulate frames with a coarse frequency offset and correct them
    Simulate {
        /// DAB transmission mode (I, II, III, IV)
        #[arg(long, default_value = "I")]
        mode: String,

        /// JSON geometry file (overrides --mode)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Window start of the active band in the first frame (bins)
        #[arg(long)]
        offset: Option<usize>,

        /// Offset change between consecutive frames (bins)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset_step: i64,

        /// Number of frames
        #[arg(long, default_value = "3")]
        frames: usize,

        /// OFDM symbols per frame
        #[arg(long, default_value = "76")]
        symbols_per_frame: usize,

        /// Signal-to-noise ratio per carrier in dB
        #[arg(long, default_value = "20.0")]
        snr: f64,

        /// Random seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the correction stage over a file of FFT symbols
    Correct {
        /// Input file with f32 I/Q FFT symbols
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for corrected carrier vectors
        #[arg(short, long, default_value = "carriers.iq")]
        output: PathBuf,

        /// DAB transmission mode (I, II, III, IV)
        #[arg(long, default_value = "I")]
        mode: String,

        /// JSON geometry file (overrides --mode)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Frame-start flags, one byte per symbol
        #[arg(long, conflicts_with = "frame_period")]
        flags: Option<PathBuf>,

        /// Mark a frame start every N symbols (default: only the first symbol)
        #[arg(long)]
        frame_period: Option<usize>,

        /// Write propagated frame-start flags to this file
        #[arg(long)]
        flags_out: Option<PathBuf>,

        /// Write each vector as all real parts followed by all imaginary parts
        #[arg(long)]
        split: bool,

        /// Symbols handed to the stage per work call
        #[arg(long, default_value = "64")]
        block: usize,
    },
}

fn resolve_geometry(mode: &str, config: Option<&Path>) -> Result<SymbolGeometry> {
    if let Some(path) = config {
        let file = File::open(path)
            .with_context(|| format!("Failed to open geometry config {:?}", path))?;
        let geometry: SymbolGeometry = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid geometry config {:?}", path))?;
        debug!(?geometry, "loaded geometry config");
        return Ok(geometry);
    }

    match DabMode::from_name(mode) {
        Some(mode) => Ok(SymbolGeometry::from_mode(mode)),
        None => bail!("Unknown DAB mode '{}'. Use I, II, III or IV", mode),
    }
}

fn read_samples_f32(path: &Path) -> Result<Vec<IQSample>> {
    let file = File::open(path).context("Failed to open input file")?;
    let metadata = file.metadata()?;
    let num_samples = metadata.len() as usize / 8; // 2 x f32 per sample

    let mut reader = BufReader::new(file);
    let mut samples = Vec::with_capacity(num_samples);

    for _ in 0..num_samples {
        let re = reader.read_f32::<LittleEndian>()?;
        let im = reader.read_f32::<LittleEndian>()?;
        samples.push(IQSample::new(re, im));
    }

    Ok(samples)
}

fn write_samples_f32(samples: &[IQSample], path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);

    for sample in samples {
        writer.write_f32::<LittleEndian>(sample.re)?;
        writer.write_f32::<LittleEndian>(sample.im)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_split_f32(samples: &[IQSample], vector_len: usize, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);

    for value in vectors_to_split_f32(samples, vector_len) {
        writer.write_f32::<LittleEndian>(value)?;
    }

    writer.flush()?;
    Ok(())
}

fn cmd_info(mode: String, config: Option<PathBuf>, json: bool) -> Result<()> {
    let geometry = resolve_geometry(&mode, config.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&geometry)?);
        return Ok(());
    }

    println!("OFDM Symbol Geometry");
    println!("====================");
    println!("FFT length:        {}", geometry.fft_length());
    println!("Active carriers:   {} (DC excluded)", geometry.num_carriers());
    println!("Cyclic prefix:     {} samples", geometry.cp_length());
    println!("Symbol duration:   {} samples", geometry.symbol_duration());
    println!("Zeros on left:     {}", geometry.zeros_on_left());
    println!("Offset search:     0..{} bins", geometry.search_span());
    println!(
        "Centred offset:    {} (delta_f = 0)",
        geometry.fft_length() / 2 - geometry.half_carriers()
    );
    Ok(())
}

/// Per-frame outcome of a simulation run
#[derive(Debug, Serialize)]
struct FrameSummary {
    frame: usize,
    injected_offset: usize,
    estimated_offset: usize,
    delta_f: i64,
    /// Mean absolute phase error after correction, radians
    mean_phase_error: f64,
    /// RMS error vector magnitude, percent
    evm_percent: f64,
}

/// Frequency-domain DAB symbol: QPSK carriers around an empty DC bin at
/// `offset`, rotated by the cyclic-prefix drift of `index`, plus noise
fn synth_symbol(
    geometry: &SymbolGeometry,
    carriers: &[IQSample],
    offset: usize,
    index: usize,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Vec<IQSample> {
    let df = offset as f64 + geometry.half_carriers() as f64 - (geometry.fft_length() / 2) as f64;
    let angle = TAU * df * geometry.cp_length() as f64 / geometry.fft_length() as f64 * index as f64;
    let drift = IQSample::new(angle.cos() as f32, angle.sin() as f32);

    let mut symbol: Vec<IQSample> = (0..geometry.fft_length())
        .map(|_| IQSample::new(noise.sample(rng) as f32, noise.sample(rng) as f32))
        .collect();
    let half = geometry.half_carriers();
    for (j, &c) in carriers.iter().enumerate() {
        let bin = if j < half { offset + j } else { offset + j + 1 };
        symbol[bin] += c * drift;
    }
    symbol
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    mode: String,
    config: Option<PathBuf>,
    offset: Option<usize>,
    offset_step: i64,
    frames: usize,
    symbols_per_frame: usize,
    snr: f64,
    seed: u64,
    json: bool,
) -> Result<()> {
    let geometry = resolve_geometry(&mode, config.as_deref())?;
    if symbols_per_frame == 0 {
        bail!("symbols-per-frame must be positive");
    }
    let span = geometry.search_span();
    let mut rng = StdRng::seed_from_u64(seed);
    let first_offset = offset.unwrap_or_else(|| rng.gen_range(0..span));
    if first_offset >= span {
        bail!("Offset {} outside search range 0..{}", first_offset, span);
    }

    info!(
        "Simulating {} frames x {} symbols, FFT {}, {} carriers, offset {} bins, SNR {:.1} dB",
        frames,
        symbols_per_frame,
        geometry.fft_length(),
        geometry.num_carriers(),
        first_offset,
        snr
    );

    let (channel, reports) = ChannelObserver::bounded(frames.max(1));
    let stage = CoarseFrequencyCorrector::configure(geometry).with_observer(move |r: &OffsetReport| {
        TracingObserver.on_offset(r);
        channel.on_offset(r);
    });
    let mut state = FrameState::new();

    // Unit-power carriers; noise power per bin follows from the SNR
    let sigma = (10f64.powf(-snr / 10.0) / 2.0).sqrt();
    let noise = Normal::new(0.0, sigma).with_context(|| format!("Invalid SNR {} dB", snr))?;
    let qpsk = [
        IQSample::new(1.0, 1.0).unscale(2f32.sqrt()),
        IQSample::new(-1.0, 1.0).unscale(2f32.sqrt()),
        IQSample::new(-1.0, -1.0).unscale(2f32.sqrt()),
        IQSample::new(1.0, -1.0).unscale(2f32.sqrt()),
    ];

    let mut summaries = Vec::with_capacity(frames);
    for frame in 0..frames {
        let injected = (first_offset as i64 + offset_step * frame as i64).clamp(0, span as i64 - 1) as usize;
        let mut phase_error = 0.0;
        let mut error_power = 0.0;
        let mut count = 0usize;

        for index in 0..symbols_per_frame {
            let carriers: Vec<IQSample> = (0..geometry.num_carriers())
                .map(|_| qpsk[rng.gen_range(0..4)])
                .collect();
            let symbol = synth_symbol(&geometry, &carriers, injected, index, &noise, &mut rng);
            let (out, _) = stage.process(&mut state, &symbol, index == 0)?;

            for (got, sent) in out.iter().zip(&carriers) {
                phase_error += (got * sent.conj()).arg().abs() as f64;
                error_power += (got - sent).norm_sqr() as f64;
            }
            count += carriers.len();
        }

        let summary = FrameSummary {
            frame,
            injected_offset: injected,
            estimated_offset: state.frequency_offset,
            delta_f: state.delta_f,
            mean_phase_error: phase_error / count as f64,
            evm_percent: 100.0 * (error_power / count as f64).sqrt(),
        };
        if summary.estimated_offset != summary.injected_offset {
            warn!(
                "Frame {}: estimated offset {} but injected {}",
                frame, summary.estimated_offset, summary.injected_offset
            );
        }
        summaries.push(summary);
    }

    let reported: Vec<OffsetReport> = reports.try_iter().collect();
    debug!("{} offset reports received", reported.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("Frame  Injected  Estimated  delta_f  Phase err (rad)  EVM (%)");
    println!("-----  --------  ---------  -------  ---------------  -------");
    for s in &summaries {
        println!(
            "{:>5}  {:>8}  {:>9}  {:>7}  {:>15.4}  {:>7.2}",
            s.frame, s.injected_offset, s.estimated_offset, s.delta_f, s.mean_phase_error, s.evm_percent
        );
    }

    let locked = summaries
        .iter()
        .filter(|s| s.estimated_offset == s.injected_offset)
        .count();
    println!();
    println!("Locked frames: {}/{}", locked, summaries.len());
    Ok(())
}

fn read_flags(path: &Path) -> Result<Vec<bool>> {
    let bytes = std::fs::read(path).context("Failed to read flags file")?;
    Ok(bytes.into_iter().map(|b| b != 0).collect())
}

fn write_flags(flags: &[bool], path: &Path) -> Result<()> {
    let bytes: Vec<u8> = flags.iter().map(|&f| f as u8).collect();
    std::fs::write(path, bytes).context("Failed to write flags file")?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_correct(
    input: PathBuf,
    output: PathBuf,
    mode: String,
    config: Option<PathBuf>,
    flags: Option<PathBuf>,
    frame_period: Option<usize>,
    flags_out: Option<PathBuf>,
    split: bool,
    block: usize,
) -> Result<()> {
    let geometry = resolve_geometry(&mode, config.as_deref())?;
    if block == 0 {
        bail!("block must be positive");
    }

    info!("Reading samples from {:?}", input);
    let samples = read_samples_f32(&input)?;
    let fft_length = geometry.fft_length();
    let num_symbols = samples.len() / fft_length;
    if samples.len() % fft_length != 0 {
        warn!(
            "Input holds {} trailing samples that do not form a full symbol, ignoring them",
            samples.len() % fft_length
        );
    }
    info!("Read {} symbols of {} bins", num_symbols, fft_length);

    let frame_flags = match (flags, frame_period) {
        (Some(path), _) => {
            let mut f = read_flags(&path)?;
            if f.len() < num_symbols {
                bail!("Flags file has {} entries for {} symbols", f.len(), num_symbols);
            }
            f.truncate(num_symbols);
            f
        }
        (None, Some(0)) => bail!("frame-period must be positive"),
        (None, Some(period)) => (0..num_symbols).map(|i| i % period == 0).collect(),
        (None, None) => (0..num_symbols).map(|i| i == 0).collect(),
    };

    let stage = CoarseFrequencyCorrector::configure(geometry);
    let mut runner = StreamRunner::new(stage);
    let mut carriers = Vec::with_capacity(num_symbols * geometry.num_carriers());
    let mut out_flags = Vec::with_capacity(num_symbols);

    let symbols = &samples[..num_symbols * fft_length];
    for (chunk, chunk_flags) in symbols.chunks(block * fft_length).zip(frame_flags.chunks(block)) {
        runner
            .work(chunk, chunk_flags, &mut carriers, &mut out_flags)
            .context("Correction stage rejected input")?;
    }

    let frames = out_flags.iter().filter(|&&f| f).count();
    info!(
        "Corrected {} symbols in {} frames, last offset {} bins",
        runner.items_processed(),
        frames,
        runner.state().frequency_offset
    );

    if split {
        write_split_f32(&carriers, geometry.num_carriers(), &output)?;
    } else {
        write_samples_f32(&carriers, &output)?;
    }
    info!("Wrote carriers to {:?}", output);

    if let Some(path) = flags_out {
        write_flags(&out_flags, &path)?;
        info!("Wrote flags to {:?}", path);
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Info { mode, config, json } => cmd_info(mode, config, json),

        Commands::Simulate {
            mode,
            config,
            offset,
            offset_step,
            frames,
            symbols_per_frame,
            snr,
            seed,
            json,
        } => cmd_simulate(mode, config, offset, offset_step, frames, symbols_per_frame, snr, seed, json),

        Commands::Correct {
            input,
            output,
            mode,
            config,
            flags,
            frame_period,
            flags_out,
            split,
            block,
        } => cmd_correct(input, output, mode, config, flags, frame_period, flags_out, split, block),
    }
}
