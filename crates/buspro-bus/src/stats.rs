//! Bus traffic counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatchReport;

/// Lock-free counters updated from the receive loop and from `send`.
#[derive(Debug, Default)]
pub struct BusStats {
    received: AtomicU64,
    decoded: AtomicU64,
    framing_errors: AtomicU64,
    checksum_errors: AtomicU64,
    dispatched: AtomicU64,
    observed: AtomicU64,
    handler_failures: AtomicU64,
    sent: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of [`BusStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStatsSnapshot {
    pub received: u64,
    pub decoded: u64,
    pub framing_errors: u64,
    pub checksum_errors: u64,
    /// Successful per-address handler invocations.
    pub dispatched: u64,
    /// Telegrams the all-messages observer accepted.
    pub observed: u64,
    pub handler_failures: u64,
    pub sent: u64,
    pub send_failures: u64,
}

impl BusStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checksum_error(&self) {
        self.checksum_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, report: &DispatchReport) {
        self.dispatched.fetch_add(report.delivered as u64, Ordering::Relaxed);
        if report.observed {
            self.observed.fetch_add(1, Ordering::Relaxed);
        }
        self.handler_failures.fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    pub fn record_send(&self, ok: bool) {
        if ok {
            self.sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.send_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            observed: self.observed.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes() {
        let stats = BusStats::new();
        stats.record_received();
        stats.record_decoded();
        stats.record_dispatch(&DispatchReport {
            delivered: 2,
            observed: true,
            failed: 1,
            suppressed: false,
        });
        stats.record_send(true);
        stats.record_send(false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.dispatched, 2);
        assert_eq!(snapshot.observed, 1);
        assert_eq!(snapshot.handler_failures, 1);
        assert_eq!(snapshot.sent, 1);
        assert_eq!(snapshot.send_failures, 1);

        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["received"], 1);
        assert_eq!(json["checksum_errors"], 0);
    }
}
