// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The shared bounded channel: ring storage, its lock, and the occupancy gates.
//!
//! Every worker holds an `Arc<SynchronizedChannel>`. One transfer always runs
//! in the same order:
//!
//! 1. acquire the role's gate (`empty` for producers, `filled` for consumers)
//! 2. lock the ring
//! 3. insert or remove
//! 4. unlock
//! 5. release the opposite gate
//!
//! No gate is touched while the ring lock is held.

pub mod dump;
pub mod gate;
pub mod ring;
pub mod stats;

use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::logging::{Facility, Logger, Severity};
use crate::validation::validate_capacity;
use gate::{GateClosed, OccupancyGate};
use ring::{RingBuffer, Slot, SlotAccess};
use stats::{ChannelStats, ChannelStatsSnapshot};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("failed to initialize channel: {0}")]
    ResourceInit(String),

    #[error("channel closed")]
    Closed,

    #[error("ring lock poisoned by a panicked worker")]
    Poisoned,
}

impl From<GateClosed> for ChannelError {
    fn from(_: GateClosed) -> Self {
        ChannelError::Closed
    }
}

/// Where a transfer currently is; reported to the observer passed to
/// [`SynchronizedChannel::produce_with`] and [`SynchronizedChannel::consume_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingGate,
    AwaitingLock,
    InCriticalSection,
}

/// A completed insert or remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub index: usize,
    /// Value written, or value taken out. `None` only for a remove that hit
    /// an empty slot.
    pub value: Option<u32>,
}

#[derive(Debug)]
pub struct SynchronizedChannel {
    ring: Mutex<RingBuffer>,
    gate: OccupancyGate,
    stats: ChannelStats,
    logger: Logger,
}

impl SynchronizedChannel {
    pub fn new(capacity: usize, logger: Logger) -> Result<Self, ChannelError> {
        validate_capacity(capacity).map_err(ChannelError::ResourceInit)?;
        stats::describe_metrics();
        logger.debug(
            Facility::Channel,
            &format!("Channel created with {} slots", capacity),
        );

        Ok(Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            gate: OccupancyGate::new(capacity),
            stats: ChannelStats::new(),
            logger,
        })
    }

    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    pub fn gate(&self) -> &OccupancyGate {
        &self.gate
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn stats_snapshot(&self) -> ChannelStatsSnapshot {
        self.stats.snapshot()
    }

    /// Blocking insert of `value`.
    pub fn produce(&self, value: u32) -> Result<Transfer, ChannelError> {
        self.produce_with(value, |_| {})
    }

    /// Blocking insert, calling `observe` at each phase change.
    pub fn produce_with<F>(&self, value: u32, mut observe: F) -> Result<Transfer, ChannelError>
    where
        F: FnMut(Phase),
    {
        observe(Phase::AwaitingGate);
        self.gate.acquire_empty()?;

        observe(Phase::AwaitingLock);
        let access = {
            let mut ring = match self.lock_ring() {
                Ok(ring) => ring,
                Err(e) => {
                    // Hand the slot back so the gate counts stay balanced
                    self.gate.release_empty();
                    return Err(e);
                }
            };
            observe(Phase::InCriticalSection);
            self.stats.enter_critical_section();
            let access = ring.insert(value);
            self.stats.record_insert(ring.filled());
            self.stats.exit_critical_section();
            access
        };
        self.gate.release_filled();

        self.check(&access);
        Ok(Transfer {
            index: access.index,
            value: Some(value),
        })
    }

    /// Blocking remove.
    pub fn consume(&self) -> Result<Transfer, ChannelError> {
        self.consume_with(|_| {})
    }

    /// Blocking remove, calling `observe` at each phase change.
    pub fn consume_with<F>(&self, mut observe: F) -> Result<Transfer, ChannelError>
    where
        F: FnMut(Phase),
    {
        observe(Phase::AwaitingGate);
        self.gate.acquire_filled()?;

        observe(Phase::AwaitingLock);
        let access = {
            let mut ring = match self.lock_ring() {
                Ok(ring) => ring,
                Err(e) => {
                    self.gate.release_filled();
                    return Err(e);
                }
            };
            observe(Phase::InCriticalSection);
            self.stats.enter_critical_section();
            let access = ring.remove();
            self.stats.record_remove(ring.filled());
            self.stats.exit_critical_section();
            access
        };
        self.gate.release_empty();

        self.check(&access);
        Ok(Transfer {
            index: access.index,
            value: access.previous.value(),
        })
    }

    /// Copy of the ring contents in index order.
    ///
    /// Readable even after a worker panicked while holding the lock, so the
    /// final dump is always available.
    pub fn snapshot(&self) -> Vec<Slot> {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Number of filled slots as tracked by the ring
    pub fn filled(&self) -> usize {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .filled()
    }

    /// Wake every blocked worker and fail all further transfers.
    pub fn close(&self) {
        self.gate.close();
        self.logger.debug(Facility::Gate, "Occupancy gates closed");
    }

    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    fn lock_ring(&self) -> Result<MutexGuard<'_, RingBuffer>, ChannelError> {
        self.ring.lock().map_err(|_| ChannelError::Poisoned)
    }

    fn check(&self, access: &SlotAccess) {
        if let Some(violation) = access.violation() {
            self.stats.record_violation();
            self.logger.log_kv(
                Severity::Error,
                Facility::Channel,
                &format!("Protocol violation: {}", violation),
                &[("slot", &access.index.to_string())],
            );
        }
    }
}
