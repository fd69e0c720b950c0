// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Bounded-buffer producer/consumer synchronizer.
//!
//! N producer threads and M consumer threads share a fixed-capacity ring.
//! Producers block while the ring is full, consumers while it is empty, and
//! every ring access happens under one lock.

pub mod channel;
pub mod config;
pub mod logging;
pub mod shutdown;
pub mod supervisor;
pub mod validation;
pub mod worker;

pub use channel::ring::{RingBuffer, Slot};
pub use channel::{ChannelError, SynchronizedChannel};
pub use config::{ArgumentError, CommandLineArgument, SyncConfig};
pub use supervisor::{ShutdownReport, Supervisor, SupervisorError};
pub use worker::{Role, WorkerId, WorkerState};
