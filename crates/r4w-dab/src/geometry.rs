//! OFDM symbol geometry
//!
//! Static description of one frequency-domain symbol: FFT size, number of
//! active subcarriers, cyclic prefix length and where the unused DC carrier
//! sits. A geometry is validated once when it is built and never changes
//! afterwards, so every stage can index symbols without re-checking bounds.

use serde::{Deserialize, Serialize};

use crate::types::{DspError, DspResult};

/// DAB transmission mode (ETSI EN 300 401)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DabMode {
    /// Mode I: 2048-point FFT, VHF Band III
    I,
    /// Mode II: 512-point FFT, L-Band
    II,
    /// Mode III: 256-point FFT, below 3 GHz
    III,
    /// Mode IV: 1024-point FFT, L-Band
    IV,
}

impl DabMode {
    /// All transmission modes, in order
    pub const ALL: [DabMode; 4] = [DabMode::I, DabMode::II, DabMode::III, DabMode::IV];

    /// `(fft_length, num_carriers, cp_length)` for this mode
    pub fn dimensions(self) -> (usize, usize, usize) {
        match self {
            DabMode::I => (2048, 1536, 504),
            DabMode::II => (512, 384, 126),
            DabMode::III => (256, 192, 63),
            DabMode::IV => (1024, 768, 252),
        }
    }

    /// Parse a mode name ("I", "2", "mode3", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_uppercase();
        let name = name.strip_prefix("MODE").unwrap_or(&name).trim();
        match name {
            "I" | "1" => Some(DabMode::I),
            "II" | "2" => Some(DabMode::II),
            "III" | "3" => Some(DabMode::III),
            "IV" | "4" => Some(DabMode::IV),
            _ => None,
        }
    }
}

/// Unvalidated geometry as it appears in a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Total FFT bins
    pub fft_length: usize,
    /// Active subcarriers, DC excluded
    pub num_carriers: usize,
    /// Cyclic prefix length in samples
    pub cp_length: usize,
}

/// Validated OFDM symbol geometry
///
/// Invariants: all lengths are positive, `num_carriers` is even and
/// `num_carriers < fft_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GeometryConfig", into = "GeometryConfig")]
pub struct SymbolGeometry {
    fft_length: usize,
    num_carriers: usize,
    cp_length: usize,
    zeros_on_left: usize,
}

impl SymbolGeometry {
    /// Build a geometry, rejecting configurations no symbol could satisfy
    pub fn new(fft_length: usize, num_carriers: usize, cp_length: usize) -> DspResult<Self> {
        if fft_length == 0 {
            return Err(DspError::ZeroLength { field: "fft_length" });
        }
        if num_carriers == 0 {
            return Err(DspError::ZeroLength { field: "num_carriers" });
        }
        if cp_length == 0 {
            return Err(DspError::ZeroLength { field: "cp_length" });
        }
        if num_carriers % 2 != 0 {
            return Err(DspError::OddCarrierCount(num_carriers));
        }
        if num_carriers >= fft_length {
            return Err(DspError::CarriersExceedFft {
                num_carriers,
                fft_length,
            });
        }

        Ok(Self {
            fft_length,
            num_carriers,
            cp_length,
            zeros_on_left: (fft_length - num_carriers) / 2,
        })
    }

    /// Geometry of a standard DAB transmission mode
    pub fn from_mode(mode: DabMode) -> Self {
        let (fft_length, num_carriers, cp_length) = mode.dimensions();
        Self {
            fft_length,
            num_carriers,
            cp_length,
            zeros_on_left: (fft_length - num_carriers) / 2,
        }
    }

    /// Total number of FFT bins per symbol
    pub fn fft_length(&self) -> usize {
        self.fft_length
    }

    /// Number of active subcarriers, DC excluded
    pub fn num_carriers(&self) -> usize {
        self.num_carriers
    }

    /// Cyclic prefix length in samples
    pub fn cp_length(&self) -> usize {
        self.cp_length
    }

    /// Unused bins left of the active band when the signal is centered
    pub fn zeros_on_left(&self) -> usize {
        self.zeros_on_left
    }

    /// Active carriers on each side of DC
    pub fn half_carriers(&self) -> usize {
        self.num_carriers / 2
    }

    /// Position of the DC bin relative to the start of a carrier window
    pub fn dc_offset(&self) -> usize {
        self.num_carriers / 2
    }

    /// Number of candidate window positions: offsets lie in `[0, search_span)`
    pub fn search_span(&self) -> usize {
        self.fft_length - self.num_carriers
    }

    /// Symbol duration including the cyclic prefix
    pub fn symbol_duration(&self) -> usize {
        self.fft_length + self.cp_length
    }
}

impl TryFrom<GeometryConfig> for SymbolGeometry {
    type Error = DspError;

    fn try_from(raw: GeometryConfig) -> DspResult<Self> {
        SymbolGeometry::new(raw.fft_length, raw.num_carriers, raw.cp_length)
    }
}

impl From<SymbolGeometry> for GeometryConfig {
    fn from(geometry: SymbolGeometry) -> Self {
        GeometryConfig {
            fft_length: geometry.fft_length,
            num_carriers: geometry.num_carriers,
            cp_length: geometry.cp_length,
        }
    }
}

impl From<DabMode> for SymbolGeometry {
    fn from(mode: DabMode) -> Self {
        SymbolGeometry::from_mode(mode)
    }
}
