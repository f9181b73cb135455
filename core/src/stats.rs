//! Sync statistics
//!
//! Lock-free counters updated from the signal-handling context and read
//! from any task. All counters wrap.

use core::sync::atomic::{AtomicU32, Ordering};

/// Counters of the window and sync packet activity
pub struct SyncStats {
    windows_started: AtomicU32,
    windows_cancelled: AtomicU32,
    packets_sent: AtomicU32,
    packets_received: AtomicU32,
    corrections_armed: AtomicU32,
    already_aligned: AtomicU32,
    spurious_radio_events: AtomicU32,
    last_offset: AtomicU32,
}

/// Point-in-time copy of [`SyncStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    pub windows_started: u32,
    pub windows_cancelled: u32,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub corrections_armed: u32,
    pub already_aligned: u32,
    pub spurious_radio_events: u32,
    /// Offset measured from the most recent sync packet
    pub last_offset: u32,
}

impl SyncStats {
    pub const fn new() -> Self {
        Self {
            windows_started: AtomicU32::new(0),
            windows_cancelled: AtomicU32::new(0),
            packets_sent: AtomicU32::new(0),
            packets_received: AtomicU32::new(0),
            corrections_armed: AtomicU32::new(0),
            already_aligned: AtomicU32::new(0),
            spurious_radio_events: AtomicU32::new(0),
            last_offset: AtomicU32::new(0),
        }
    }

    pub(crate) fn record_window_started(&self) {
        self.windows_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.windows_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_packet_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_packet_received(&self, offset: u32) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.last_offset.store(offset, Ordering::Relaxed);
    }

    pub(crate) fn record_correction_armed(&self) {
        self.corrections_armed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_already_aligned(&self) {
        self.already_aligned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spurious(&self) {
        self.spurious_radio_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            windows_started: self.windows_started.load(Ordering::Relaxed),
            windows_cancelled: self.windows_cancelled.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            corrections_armed: self.corrections_armed.load(Ordering::Relaxed),
            already_aligned: self.already_aligned.load(Ordering::Relaxed),
            spurious_radio_events: self.spurious_radio_events.load(Ordering::Relaxed),
            last_offset: self.last_offset.load(Ordering::Relaxed),
        }
    }
}

impl Default for SyncStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let stats = SyncStats::new();
        stats.record_window_started();
        stats.record_window_started();
        stats.record_packet_received(951);
        stats.record_correction_armed();

        let snap = stats.snapshot();
        assert_eq!(snap.windows_started, 2);
        assert_eq!(snap.packets_received, 1);
        assert_eq!(snap.corrections_armed, 1);
        assert_eq!(snap.last_offset, 951);
        assert_eq!(snap.packets_sent, 0);
    }
}
