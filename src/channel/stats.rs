// SPDX-License-Identifier: Apache-2.0 OR MIT
use metrics::{counter, describe_counter, describe_gauge, gauge};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub const INSERTS_TOTAL: &str = "ringsync_inserts_total";
pub const REMOVES_TOTAL: &str = "ringsync_removes_total";
pub const PROTOCOL_VIOLATIONS_TOTAL: &str = "ringsync_protocol_violations_total";
pub const OCCUPANCY: &str = "ringsync_occupancy";

/// Register metric descriptions with whatever recorder is installed.
pub fn describe_metrics() {
    describe_counter!(INSERTS_TOTAL, "Values written into the ring");
    describe_counter!(REMOVES_TOTAL, "Values taken out of the ring");
    describe_counter!(
        PROTOCOL_VIOLATIONS_TOTAL,
        "Inserts into a filled slot or removes from an empty one"
    );
    describe_gauge!(OCCUPANCY, "Filled slots after the last ring access");
}

/// Counters shared by every worker touching one channel
#[derive(Debug, Default)]
pub struct ChannelStats {
    inserts: AtomicU64,
    removes: AtomicU64,
    protocol_violations: AtomicU64,
    active_critical_sections: AtomicUsize,
    peak_critical_sections: AtomicUsize,
    peak_occupancy: AtomicUsize,
}

/// Point-in-time copy of [`ChannelStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelStatsSnapshot {
    pub inserts: u64,
    pub removes: u64,
    pub protocol_violations: u64,
    pub peak_critical_sections: usize,
    pub peak_occupancy: usize,
}

impl ChannelStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called right after the ring lock is taken.
    pub fn enter_critical_section(&self) {
        let active = self.active_critical_sections.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_critical_sections
            .fetch_max(active, Ordering::AcqRel);
    }

    /// Called right before the ring lock is released.
    pub fn exit_critical_section(&self) {
        self.active_critical_sections.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn record_insert(&self, occupancy: usize) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        counter!(INSERTS_TOTAL).increment(1);
        self.record_occupancy(occupancy);
    }

    pub fn record_remove(&self, occupancy: usize) {
        self.removes.fetch_add(1, Ordering::Relaxed);
        counter!(REMOVES_TOTAL).increment(1);
        self.record_occupancy(occupancy);
    }

    pub fn record_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
        counter!(PROTOCOL_VIOLATIONS_TOTAL).increment(1);
    }

    fn record_occupancy(&self, occupancy: usize) {
        self.peak_occupancy.fetch_max(occupancy, Ordering::Relaxed);
        gauge!(OCCUPANCY).set(occupancy as f64);
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    pub fn removes(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }

    pub fn protocol_violations(&self) -> u64 {
        self.protocol_violations.load(Ordering::Relaxed)
    }

    pub fn peak_critical_sections(&self) -> usize {
        self.peak_critical_sections.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            inserts: self.inserts(),
            removes: self.removes(),
            protocol_violations: self.protocol_violations(),
            peak_critical_sections: self.peak_critical_sections(),
            peak_occupancy: self.peak_occupancy.load(Ordering::Relaxed),
        }
    }
}
