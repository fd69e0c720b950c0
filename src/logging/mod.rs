// SPDX-License-Identifier: Apache-2.0 OR MIT
// Non-blocking logging for the supervisor and its worker threads
//
// Workers format an entry and push it into a bounded ring; a consumer thread
// drains the ring into a sink. Writers never wait on terminal I/O.

mod consumer;
mod entry;
mod facility;
pub mod integration;
mod logger;
#[macro_use]
mod macros;
mod ringbuffer;
mod severity;

pub use consumer::{BlockingConsumer, LogSink, StdoutSink};
pub use entry::{KeyValue, LogEntry};
pub use facility::Facility;
pub use integration::LoggingSystem;
pub use logger::{LogWriter, Logger, NullWriter, StderrJsonWriter};
pub use ringbuffer::LogRing;
pub use severity::Severity;
