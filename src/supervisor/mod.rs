// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Startup, monitoring and teardown of the worker threads.
//!
//! The supervisor owns the channel and every join handle. The signal handler
//! never touches either: it only fires the oneshot that [`run`] waits on, and
//! the whole stop/join/dump sequence happens on the supervisor's side.

mod worker_manager;

pub use worker_manager::{spawn_thread, WorkerFailure, WorkerResult};

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::time::Duration;

use crate::channel::dump;
use crate::channel::ring::Slot;
use crate::channel::stats::ChannelStatsSnapshot;
use crate::channel::{ChannelError, SynchronizedChannel};
use crate::config::{CommandLineArgument, ConfigError, SyncConfig};
use crate::logging::{Facility, Logger};
use crate::shutdown::ShutdownSignal;
use crate::worker::{
    Role, SharedRandom, Worker, WorkerContext, WorkerId, WorkerState, WorkerSummary,
};
use crate::{log_debug, log_error, log_info, log_notice};
use worker_manager::WorkerManager;

/// Interval between checks for workers that exited on their own
pub const HEALTH_CHECK_INTERVAL_MS: u64 = 250;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("failed to spawn {worker}: {reason}")]
    Spawn { worker: WorkerId, reason: String },
}

/// Everything known once all workers have been joined
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    /// Ring contents in index order, taken after the last worker was joined
    pub snapshot: Vec<Slot>,
    pub summaries: Vec<WorkerSummary>,
    pub stats: ChannelStatsSnapshot,
    pub failures: Vec<WorkerFailure>,
    /// State of every worker after the join, in spawn order
    pub final_states: Vec<(WorkerId, WorkerState)>,
    /// `empty + filled == capacity` held after the join
    pub gate_balanced: bool,
}

impl ShutdownReport {
    /// The table printed on exit
    pub fn render_dump(&self) -> String {
        dump::render(&self.snapshot)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.gate_balanced && self.stats.protocol_violations == 0
    }
}

pub struct Supervisor {
    channel: Arc<SynchronizedChannel>,
    shutdown: Arc<ShutdownSignal>,
    manager: WorkerManager,
    logger: Logger,
}

impl Supervisor {
    /// Build the channel and spawn `args.producer_number` producers followed
    /// by `args.consumer_number` consumers.
    pub fn start(
        config: &SyncConfig,
        args: CommandLineArgument,
        logger: Logger,
    ) -> Result<Self, SupervisorError> {
        Self::start_generic(config, args, logger, spawn_thread)
    }

    /// [`Supervisor::start`] with the thread spawner injected.
    ///
    /// If any spawn fails, the workers already started are stopped and
    /// joined before the error is returned.
    pub fn start_generic<F>(
        config: &SyncConfig,
        args: CommandLineArgument,
        logger: Logger,
        mut spawn: F,
    ) -> Result<Self, SupervisorError>
    where
        F: FnMut(Worker) -> Result<JoinHandle<WorkerResult>>,
    {
        config.validate()?;
        let channel = Arc::new(SynchronizedChannel::new(config.capacity, logger.clone())?);
        let ctx = WorkerContext {
            channel: Arc::clone(&channel),
            shutdown: Arc::new(ShutdownSignal::new()),
            random: Arc::new(SharedRandom::new(config.seed, config.capacity)),
            delay_unit: config.delay_unit(),
            logger: logger.clone(),
        };

        let mut supervisor = Self {
            channel,
            shutdown: Arc::clone(&ctx.shutdown),
            manager: WorkerManager::new(logger.clone()),
            logger,
        };
        log_info!(
            supervisor.logger,
            Facility::Supervisor,
            "Starting {} producers and {} consumers on {} slots",
            args.producer_number,
            args.consumer_number,
            config.capacity
        );

        let roster = (0..args.producer_number)
            .map(|i| WorkerId::new(Role::Producer, i))
            .chain((0..args.consumer_number).map(|i| WorkerId::new(Role::Consumer, i)));

        for id in roster {
            let worker = Worker::new(id, ctx.clone());
            let state = worker.state_handle();
            match spawn(worker) {
                Ok(handle) => supervisor.manager.register(id, state, handle),
                Err(e) => {
                    log_error!(
                        supervisor.logger,
                        Facility::Supervisor,
                        "Failed to spawn {}: {:#}; stopping {} started workers",
                        id,
                        e,
                        supervisor.manager.workers.len()
                    );
                    supervisor.stop_and_join();
                    return Err(SupervisorError::Spawn {
                        worker: id,
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(supervisor)
    }

    /// Spawned workers in spawn order
    pub fn workers(&self) -> Vec<WorkerId> {
        self.manager.ids()
    }

    pub fn worker_states(&self) -> Vec<(WorkerId, WorkerState)> {
        self.manager.states()
    }

    pub fn channel(&self) -> &Arc<SynchronizedChannel> {
        &self.channel
    }

    /// Log and return workers that exited without being asked to.
    pub fn check_health(&mut self) -> Vec<WorkerId> {
        if self.shutdown.is_triggered() {
            return Vec::new();
        }
        self.manager.detect_exited_workers()
    }

    pub fn all_workers_exited(&self) -> bool {
        self.manager.all_exited()
    }

    /// Stop every worker, join them all, then snapshot the ring.
    ///
    /// Blocks for at most one in-flight transfer per worker: sleeps are cut
    /// short and gate waits fail once the gates are closed.
    pub fn shutdown(mut self) -> ShutdownReport {
        log_notice!(self.logger, Facility::Supervisor, "Shutting down");
        let (summaries, failures) = self.stop_and_join();

        let final_states = self.manager.states();
        let snapshot = self.channel.snapshot();
        let gate = self.channel.gate();
        let gate_balanced = gate.is_balanced();
        if !gate_balanced {
            log_error!(
                self.logger,
                Facility::Gate,
                "Gate counts out of balance: empty {} + filled {} != {}",
                gate.empty_count(),
                gate.filled_count(),
                gate.capacity()
            );
        }

        let stats = self.channel.stats_snapshot();
        log_info!(
            self.logger,
            Facility::Supervisor,
            "Stopped {} workers: {} inserts, {} removes, {} protocol violations",
            summaries.len() + failures.len(),
            stats.inserts,
            stats.removes,
            stats.protocol_violations
        );

        ShutdownReport {
            snapshot,
            summaries,
            stats,
            failures,
            final_states,
            gate_balanced,
        }
    }

    fn stop_and_join(&mut self) -> (Vec<WorkerSummary>, Vec<WorkerFailure>) {
        self.shutdown.trigger();
        self.channel.close();
        let joined = self.manager.join_all();
        log_debug!(self.logger, Facility::Supervisor, "All workers joined");
        joined
    }
}

/// Start the workers and keep them running until `shutdown_rx` fires (or its
/// sender is dropped), then shut down on a blocking thread.
pub async fn run(
    config: SyncConfig,
    args: CommandLineArgument,
    logger: Logger,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<ShutdownReport> {
    let mut supervisor =
        Supervisor::start(&config, args, logger.clone()).context("Failed to start workers")?;

    let mut health_check_interval =
        tokio::time::interval(Duration::from_millis(HEALTH_CHECK_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                log_debug!(logger, Facility::Supervisor, "Shutdown requested");
                break;
            }

            _ = health_check_interval.tick() => {
                supervisor.check_health();
                if supervisor.all_workers_exited() {
                    log_error!(logger, Facility::Supervisor, "All workers have exited");
                    break;
                }
            }
        }
    }

    tokio::task::spawn_blocking(move || supervisor.shutdown())
        .await
        .context("Shutdown task panicked")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(capacity: usize) -> SyncConfig {
        SyncConfig {
            delay_unit_ms: 1,
            ..SyncConfig::with_capacity(capacity)
        }
    }

    #[test]
    fn test_invalid_capacity_spawns_nothing() {
        let args = CommandLineArgument {
            producer_number: 1,
            consumer_number: 1,
        };
        let mut spawned = 0;
        let result = Supervisor::start_generic(&fast_config(0), args, Logger::null(), |worker| {
            spawned += 1;
            spawn_thread(worker)
        });
        assert!(matches!(result, Err(SupervisorError::Config(_))));
        assert_eq!(spawned, 0);
    }

    #[test]
    fn test_report_is_clean_after_normal_run() {
        let args = CommandLineArgument::new(2, 2, 3).unwrap();
        let supervisor = Supervisor::start(&fast_config(3), args, Logger::null()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        let report = supervisor.shutdown();
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.summaries.len(), 4);
        assert_eq!(report.snapshot.len(), 3);

        let filled = report.snapshot.iter().filter(|s| s.is_filled()).count() as u64;
        assert_eq!(filled, report.stats.inserts - report.stats.removes);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_message() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let args = CommandLineArgument::new(1, 1, 9).unwrap();
        let runner = tokio::spawn(run(fast_config(9), args, Logger::null(), rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        let report = runner.await.unwrap().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.summaries.len(), 2);
        assert!(report.render_dump().contains("8   |"));
    }
}
