//! Diagnostic sinks for coarse frequency estimates
//!
//! Every frame start produces an [`OffsetReport`]. The stage hands it to
//! whatever [`OffsetObserver`] the caller supplied and carries on; observers
//! must return quickly and must never fail the stream.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use serde::{Deserialize, Serialize};
use tracing::{info, trace};

/// Offset estimate published at a frame start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetReport {
    /// Estimated window start in subcarriers
    pub frequency_offset: usize,
    /// Signed offset of the spectrum centre in subcarriers
    pub delta_f: i64,
    /// Energy captured by the winning window
    pub peak_energy: f64,
}

/// Receiver of offset reports
pub trait OffsetObserver: Send + Sync {
    /// Called once per frame start, after the new offset has been estimated
    fn on_offset(&self, report: &OffsetReport);
}

impl<F> OffsetObserver for F
where
    F: Fn(&OffsetReport) + Send + Sync,
{
    fn on_offset(&self, report: &OffsetReport) {
        self(report)
    }
}

/// Logs each estimate through `tracing` at INFO level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl OffsetObserver for TracingObserver {
    fn on_offset(&self, report: &OffsetReport) {
        info!(
            offset = report.frequency_offset,
            delta_f = report.delta_f,
            energy = report.peak_energy,
            "coarse freq. offset (subcarriers): {}",
            report.frequency_offset
        );
    }
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl OffsetObserver for NullObserver {
    fn on_offset(&self, _report: &OffsetReport) {}
}

/// Forwards reports over a bounded channel without ever blocking
///
/// When the receiver lags behind or has gone away the report is dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: SyncSender<OffsetReport>,
}

impl ChannelObserver {
    /// Wrap an existing sender
    pub fn new(tx: SyncSender<OffsetReport>) -> Self {
        Self { tx }
    }

    /// Create an observer and the receiving end of a channel holding
    /// at most `capacity` pending reports
    pub fn bounded(capacity: usize) -> (Self, Receiver<OffsetReport>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (Self::new(tx), rx)
    }
}

impl OffsetObserver for ChannelObserver {
    fn on_offset(&self, report: &OffsetReport) {
        match self.tx.try_send(*report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                trace!(offset = report.frequency_offset, "offset report dropped, sink full");
            }
            Err(TrySendError::Disconnected(_)) => {
                trace!(offset = report.frequency_offset, "offset report dropped, sink gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn report(offset: usize) -> OffsetReport {
        OffsetReport {
            frequency_offset: offset,
            delta_f: offset as i64 - 256,
            peak_energy: 1.0,
        }
    }

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let observer = move |r: &OffsetReport| {
            seen_clone.store(r.frequency_offset, Ordering::SeqCst);
        };
        observer.on_offset(&report(300));
        assert_eq!(seen.load(Ordering::SeqCst), 300);
    }

    #[test]
    fn test_channel_observer_drops_when_full() {
        let (observer, rx) = ChannelObserver::bounded(2);
        for offset in 0..5 {
            observer.on_offset(&report(offset));
        }
        let received: Vec<usize> = rx.try_iter().map(|r| r.frequency_offset).collect();
        assert_eq!(received, vec![0, 1]);
    }

    #[test]
    fn test_channel_observer_survives_disconnect() {
        let (observer, rx) = ChannelObserver::bounded(1);
        drop(rx);
        observer.on_offset(&report(1));
    }

    #[test]
    fn test_tracing_and_null_observers() {
        TracingObserver.on_offset(&report(10));
        NullObserver.on_offset(&report(10));
    }
}
