// SPDX-License-Identifier: Apache-2.0 OR MIT
//! # Worker Module
//!
//! A worker is one OS thread in one of two roles. Producers draw a value from
//! the shared generator and insert it; consumers remove whatever the read
//! cursor points at. Both roles run the same loop:
//!
//! ```text
//! Idle -> Delaying -> AwaitingGate -> AwaitingLock -> InCriticalSection
//!      -> Reporting -> Delaying -> ...                          -> Stopped
//! ```
//!
//! The shutdown signal is honoured during the delay, while blocked on a gate
//! (the supervisor closes the gates), and after each report. Once a gate has
//! been acquired the transfer always runs to completion.
//!
//! The current state is published through a [`StateCell`] the supervisor can
//! read without touching the worker.

pub mod random;
pub mod stats;

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::channel::{ChannelError, Phase, SynchronizedChannel, Transfer};
use crate::logging::{Facility, Logger};
use crate::shutdown::ShutdownSignal;
use crate::{log_debug, log_error, log_info};

pub use random::SharedRandom;
pub use stats::WorkerSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "Producer",
            Role::Consumer => "Consumer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role plus a 0-based identity unique within that role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkerId {
    pub role: Role,
    pub identity: u32,
}

impl WorkerId {
    pub const fn new(role: Role, identity: u32) -> Self {
        Self { role, identity }
    }

    /// OS thread name, e.g. `producer-0`
    pub fn thread_name(&self) -> String {
        format!("{}-{}", self.role.as_str().to_lowercase(), self.identity)
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.role, self.identity)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerState {
    Idle = 0,
    Delaying = 1,
    AwaitingGate = 2,
    AwaitingLock = 3,
    InCriticalSection = 4,
    Reporting = 5,
    Stopped = 6,
}

impl WorkerState {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(WorkerState::Idle),
            1 => Some(WorkerState::Delaying),
            2 => Some(WorkerState::AwaitingGate),
            3 => Some(WorkerState::AwaitingLock),
            4 => Some(WorkerState::InCriticalSection),
            5 => Some(WorkerState::Reporting),
            6 => Some(WorkerState::Stopped),
            _ => None,
        }
    }
}

impl From<Phase> for WorkerState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::AwaitingGate => WorkerState::AwaitingGate,
            Phase::AwaitingLock => WorkerState::AwaitingLock,
            Phase::InCriticalSection => WorkerState::InCriticalSection,
        }
    }
}

/// Lock-free holder of a worker's current [`WorkerState`]
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn store(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn load(&self) -> WorkerState {
        // Only `store` writes the cell, so the value is always a valid state
        WorkerState::from_u8(self.0.load(Ordering::Acquire)).unwrap_or(WorkerState::Stopped)
    }
}

/// Everything a worker shares with its siblings
#[derive(Clone)]
pub struct WorkerContext {
    pub channel: Arc<SynchronizedChannel>,
    pub shutdown: Arc<ShutdownSignal>,
    pub random: Arc<SharedRandom>,
    pub delay_unit: Duration,
    pub logger: Logger,
}

pub struct Worker {
    id: WorkerId,
    ctx: WorkerContext,
    state: Arc<StateCell>,
}

impl Worker {
    pub fn new(id: WorkerId, ctx: WorkerContext) -> Self {
        Self {
            id,
            ctx,
            state: Arc::new(StateCell::new(WorkerState::Idle)),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Handle for observing this worker's state from another thread
    pub fn state_handle(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Run until shutdown. Consumes the worker; meant to be the body of its
    /// thread.
    ///
    /// Returns `Ok` when stopped by shutdown and `Err` if the channel became
    /// unusable (a poisoned ring lock).
    pub fn run(self) -> Result<WorkerSummary, ChannelError> {
        let facility = Facility::for_role(self.id.role);
        let mut summary = WorkerSummary::new(self.id);
        log_debug!(self.ctx.logger, facility, "{} started", self.id);

        loop {
            self.state.store(WorkerState::Delaying);
            let units = self.ctx.random.next_delay();
            if !self.ctx.shutdown.sleep(self.ctx.delay_unit * units) {
                break;
            }

            match self.transfer() {
                Ok(transfer) => {
                    self.state.store(WorkerState::Reporting);
                    self.report(facility, &transfer);
                    summary.record(transfer.index, transfer.value);
                }
                Err(ChannelError::Closed) => break,
                Err(e) => {
                    self.state.store(WorkerState::Stopped);
                    log_error!(self.ctx.logger, facility, "{} stopped: {}", self.id, e);
                    return Err(e);
                }
            }

            if self.ctx.shutdown.is_triggered() {
                break;
            }
        }

        self.state.store(WorkerState::Stopped);
        log_debug!(self.ctx.logger, facility, "{} stopped", self.id);
        Ok(summary)
    }

    fn transfer(&self) -> Result<Transfer, ChannelError> {
        let observe = |phase: Phase| self.state.store(phase.into());
        match self.id.role {
            Role::Producer => {
                let value = self.ctx.random.next_value();
                self.ctx.channel.produce_with(value, observe)
            }
            Role::Consumer => self.ctx.channel.consume_with(observe),
        }
    }

    fn report(&self, facility: Facility, transfer: &Transfer) {
        let logger = &self.ctx.logger;
        match (self.id.role, transfer.value) {
            (Role::Producer, Some(value)) => log_info!(
                logger,
                facility,
                "{} insert value 0x{:08x} into buffer[{}]",
                self.id,
                value,
                transfer.index
            ),
            (Role::Consumer, Some(value)) => log_info!(
                logger,
                facility,
                "{} remove value 0x{:08x} from buffer[{}]",
                self.id,
                value,
                transfer.index
            ),
            (_, None) => log_info!(
                logger,
                facility,
                "{} found buffer[{}] empty",
                self.id,
                transfer.index
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogRing, Severity};
    use std::thread;

    fn context(capacity: usize, logger: Logger) -> WorkerContext {
        WorkerContext {
            channel: Arc::new(SynchronizedChannel::new(capacity, logger.clone()).unwrap()),
            shutdown: Arc::new(ShutdownSignal::new()),
            random: Arc::new(SharedRandom::new(1, capacity)),
            delay_unit: Duration::from_millis(1),
            logger,
        }
    }

    #[test]
    fn test_worker_id_names() {
        let id = WorkerId::new(Role::Producer, 3);
        assert_eq!(id.to_string(), "Producer[3]");
        assert_eq!(id.thread_name(), "producer-3");
        assert_eq!(WorkerId::new(Role::Consumer, 0).thread_name(), "consumer-0");
    }

    #[test]
    fn test_state_cell_round_trip() {
        let cell = StateCell::new(WorkerState::Idle);
        for value in 0..=6 {
            let state = WorkerState::from_u8(value).unwrap();
            cell.store(state);
            assert_eq!(cell.load(), state);
        }
        assert_eq!(WorkerState::from_u8(7), None);
    }

    #[test]
    fn test_shutdown_before_start_stops_immediately() {
        let ctx = context(3, Logger::null());
        ctx.shutdown.trigger();
        let worker = Worker::new(WorkerId::new(Role::Producer, 0), ctx.clone());
        let state = worker.state_handle();

        let summary = worker.run().unwrap();
        assert_eq!(summary.operations, 0);
        assert_eq!(state.load(), WorkerState::Stopped);
        assert!(ctx.channel.gate().is_balanced());
    }

    #[test]
    fn test_blocked_consumer_stops_when_gates_close() {
        let ctx = context(2, Logger::null());
        let worker = Worker::new(WorkerId::new(Role::Consumer, 0), ctx.clone());
        let state = worker.state_handle();
        let handle = thread::spawn(move || worker.run());

        // Nothing is ever produced, so the consumer parks on the filled gate
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while state.load() != WorkerState::AwaitingGate {
            assert!(std::time::Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }

        ctx.shutdown.trigger();
        ctx.channel.close();
        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.operations, 0);
        assert_eq!(state.load(), WorkerState::Stopped);
    }

    #[test]
    fn test_producer_reports_each_insert() {
        let ring = Arc::new(LogRing::new(256));
        let logger = Logger::from_ring(Arc::clone(&ring), Severity::Info);
        let ctx = context(4, logger);

        let worker = Worker::new(WorkerId::new(Role::Producer, 1), ctx.clone());
        let handle = thread::spawn(move || worker.run());

        // Capacity 4 and no consumer: the producer fills the ring, then blocks
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while ctx.channel.filled() < 4 {
            assert!(std::time::Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        ctx.shutdown.trigger();
        ctx.channel.close();
        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.operations, 4);

        let mut reports = Vec::new();
        while let Some(entry) = ring.read() {
            if entry.facility == Facility::Producer && entry.get_message().contains("insert value") {
                reports.push(entry.get_message().to_string());
            }
        }
        assert_eq!(reports.len(), 4);
        assert!(reports[0].contains("Producer[1] insert value 0x"));
        assert!(reports[0].ends_with("into buffer[0]"));
        assert!(reports[3].ends_with("into buffer[3]"));
    }
}
