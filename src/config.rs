// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Runtime configuration and command-line argument validation.
//!
//! The binary runs with [`SyncConfig::default`]; there are no flags or
//! environment variables. Library users (and the tests) build their own
//! configs, typically with a much shorter delay unit.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::logging::Severity;
use crate::validation::{validate_capacity, validate_worker_count};

/// Ring capacity used by the binary
pub const DEFAULT_CAPACITY: usize = 9;
/// One delay unit in the binary is one second
pub const DEFAULT_DELAY_UNIT_MS: u64 = 1000;
/// Seed of the shared pseudo-random generator
pub const DEFAULT_SEED: u64 = 1;

/// Startup configuration of the synchronizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Number of slots in the ring
    pub capacity: usize,

    /// Length of one delay unit; workers sleep `0..capacity` units per iteration
    pub delay_unit_ms: u64,

    /// Seed for the generator shared by all workers
    pub seed: u64,

    /// Minimum severity written by the logger
    pub log_level: Severity,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            delay_unit_ms: DEFAULT_DELAY_UNIT_MS,
            seed: DEFAULT_SEED,
            log_level: Severity::Info,
        }
    }
}

impl SyncConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn delay_unit(&self) -> Duration {
        Duration::from_millis(self.delay_unit_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_capacity(self.capacity).map_err(ConfigError::InvalidCapacity)
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),
}

/// Command-line argument errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Parameters should be between 1 and {capacity}.")]
    OutOfRange {
        capacity: usize,
        producer_number: i64,
        consumer_number: i64,
    },
}

/// Validated worker counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLineArgument {
    pub producer_number: u32,
    pub consumer_number: u32,
}

impl CommandLineArgument {
    /// Both counts must lie in `[1, capacity]`. Takes the raw parsed width
    /// so negative and oversized input reports the range error.
    pub fn new(
        producer_number: i64,
        consumer_number: i64,
        capacity: usize,
    ) -> Result<Self, ArgumentError> {
        let out_of_range = ArgumentError::OutOfRange {
            capacity,
            producer_number,
            consumer_number,
        };
        validate_worker_count(producer_number, capacity, "producerNumber")
            .and_then(|()| validate_worker_count(consumer_number, capacity, "consumerNumber"))
            .map_err(|_| out_of_range.clone())?;

        match (
            u32::try_from(producer_number),
            u32::try_from(consumer_number),
        ) {
            (Ok(producer_number), Ok(consumer_number)) => Ok(Self {
                producer_number,
                consumer_number,
            }),
            _ => Err(out_of_range),
        }
    }

    pub fn total_workers(&self) -> usize {
        self.producer_number as usize + self.consumer_number as usize
    }
}
