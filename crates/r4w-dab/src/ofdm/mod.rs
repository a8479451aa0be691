//! OFDM symbol stages
//!
//! - [`energy`]: integer frequency offset search over one symbol
//! - [`frame_sync`]: frame-start handling and per-stream state
//! - [`phase`]: cyclic-prefix phase drift rotation
//! - [`selector`]: active carrier extraction around the DC hole
//! - [`coarse_freq`]: the stage tying the above together

pub mod coarse_freq;
pub mod energy;
pub mod frame_sync;
pub mod phase;
pub mod selector;

pub use coarse_freq::CoarseFrequencyCorrector;
pub use energy::{energy_profile, estimate_offset, window_energy, OffsetEstimate};
pub use frame_sync::{FrameState, LockState, SyncEvent};
pub use phase::{delta_f, rotation, rotation_angle};
pub use selector::{select, select_into};
