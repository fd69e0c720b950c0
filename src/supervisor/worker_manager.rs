// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Worker thread lifecycle management.
//!
//! Owns the join handle and state cell of every spawned worker, detects
//! workers that exit before shutdown, and joins them all at the end.

use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::channel::ChannelError;
use crate::logging::{Facility, Logger};
use crate::worker::{StateCell, Worker, WorkerId, WorkerState, WorkerSummary};
use crate::{log_debug, log_error, log_info, log_warning};

/// What a worker thread returns when joined
pub type WorkerResult = Result<WorkerSummary, ChannelError>;

/// Spawn `worker` on a named OS thread.
pub fn spawn_thread(worker: Worker) -> anyhow::Result<JoinHandle<WorkerResult>> {
    let id = worker.id();
    thread::Builder::new()
        .name(id.thread_name())
        .spawn(move || worker.run())
        .with_context(|| format!("Failed to spawn {} thread", id))
}

/// A worker that ended with an error or a panic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerFailure {
    pub worker: WorkerId,
    pub reason: String,
}

impl std::fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.worker, self.reason)
    }
}

/// Holds all information about a single worker thread
pub(super) struct ManagedWorker {
    pub(super) id: WorkerId,
    pub(super) state: Arc<StateCell>,
    handle: Option<JoinHandle<WorkerResult>>,
    /// Set once an early exit has been logged
    reported_exit: bool,
}

/// Centralized manager for all worker lifecycle operations
pub(super) struct WorkerManager {
    pub(super) logger: Logger,
    pub(super) workers: Vec<ManagedWorker>,
}

impl WorkerManager {
    pub(super) fn new(logger: Logger) -> Self {
        Self {
            logger,
            workers: Vec::new(),
        }
    }

    pub(super) fn register(
        &mut self,
        id: WorkerId,
        state: Arc<StateCell>,
        handle: JoinHandle<WorkerResult>,
    ) {
        log_debug!(self.logger, Facility::Supervisor, "Spawned {}", id);
        self.workers.push(ManagedWorker {
            id,
            state,
            handle: Some(handle),
            reported_exit: false,
        });
    }

    pub(super) fn ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(|w| w.id).collect()
    }

    pub(super) fn states(&self) -> Vec<(WorkerId, WorkerState)> {
        self.workers.iter().map(|w| (w.id, w.state.load())).collect()
    }

    /// Workers whose thread has ended while shutdown was not requested.
    ///
    /// Non-blocking. Each worker is reported once.
    pub(super) fn detect_exited_workers(&mut self) -> Vec<WorkerId> {
        let mut exited = Vec::new();
        for worker in self.workers.iter_mut() {
            if worker.reported_exit {
                continue;
            }
            let finished = worker
                .handle
                .as_ref()
                .map_or(true, |handle| handle.is_finished());
            if finished {
                worker.reported_exit = true;
                log_warning!(
                    self.logger,
                    Facility::Supervisor,
                    "{} exited before shutdown (last state {:?})",
                    worker.id,
                    worker.state.load()
                );
                exited.push(worker.id);
            }
        }
        exited
    }

    pub(super) fn all_exited(&self) -> bool {
        self.workers.iter().all(|w| {
            w.handle
                .as_ref()
                .map_or(true, |handle| handle.is_finished())
        })
    }

    /// Join every worker, in spawn order. Blocks until all have returned.
    pub(super) fn join_all(&mut self) -> (Vec<WorkerSummary>, Vec<WorkerFailure>) {
        let mut summaries = Vec::with_capacity(self.workers.len());
        let mut failures = Vec::new();

        for worker in self.workers.iter_mut() {
            let Some(handle) = worker.handle.take() else {
                continue;
            };
            let reason = match handle.join() {
                Ok(Ok(summary)) => {
                    log_info!(self.logger, Facility::Supervisor, "Joined {}", summary);
                    summaries.push(summary);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            log_error!(
                self.logger,
                Facility::Supervisor,
                "{} failed: {}",
                worker.id,
                reason
            );
            failures.push(WorkerFailure {
                worker: worker.id,
                reason,
            });
        }

        (summaries, failures)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
