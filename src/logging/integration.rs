// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Logging Integration Module
//!
//! Wires the log ring, the consumer thread and the logger handle together for
//! the supervisor process.

use crate::logging::{BlockingConsumer, LogRing, LogSink, Logger, Severity, StdoutSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of entries buffered between workers and the consumer thread
pub const DEFAULT_LOG_RING_CAPACITY: usize = 4096;

/// Logging system for the supervisor and its worker threads
///
/// Workers write into a shared [`LogRing`]; a dedicated consumer thread drains
/// it into the sink so no worker ever blocks on terminal I/O.
pub struct LoggingSystem {
    logger: Logger,
    ring: Arc<LogRing>,
    consumer_handle: Option<JoinHandle<()>>,
    consumer_stop: Arc<AtomicBool>,
}

impl LoggingSystem {
    /// Start a logging system writing to stdout
    pub fn stdout(level: Severity) -> std::io::Result<Self> {
        Self::start(Box::new(StdoutSink::new()), level, DEFAULT_LOG_RING_CAPACITY)
    }

    pub fn start(
        sink: Box<dyn LogSink>,
        level: Severity,
        capacity: usize,
    ) -> std::io::Result<Self> {
        let ring = Arc::new(LogRing::new(capacity));
        let logger = Logger::from_ring(Arc::clone(&ring), level);

        let consumer = BlockingConsumer::new(Arc::clone(&ring), sink);
        let consumer_stop = consumer.stop_handle();
        let consumer_handle = thread::Builder::new()
            .name("log-consumer".to_string())
            .spawn(move || consumer.run())?;

        Ok(Self {
            logger,
            ring,
            consumer_handle: Some(consumer_handle),
            consumer_stop,
        })
    }

    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    /// Entries lost because the ring overflowed
    pub fn overruns(&self) -> u64 {
        self.ring.overruns()
    }

    /// Stop the consumer after it has drained everything written so far
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.consumer_stop.store(false, Ordering::Release);
        if let Some(handle) = self.consumer_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LoggingSystem {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::consumer::tests::CaptureSink;
    use crate::logging::Facility;

    #[test]
    fn test_logging_system_flushes_on_shutdown() {
        let (sink, lines) = CaptureSink::new();
        let logging = LoggingSystem::start(Box::new(sink), Severity::Info, 64).unwrap();
        let logger = logging.logger();

        logger.info(Facility::Supervisor, "Test supervisor message");
        logger.debug(Facility::Supervisor, "filtered");
        logging.shutdown();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Test supervisor message"));
    }

    #[test]
    fn test_logging_system_from_worker_threads() {
        let (sink, lines) = CaptureSink::new();
        let logging = LoggingSystem::start(Box::new(sink), Severity::Info, 256).unwrap();

        let handles: Vec<_> = (0..3)
            .map(|id| {
                let logger = logging.logger();
                thread::spawn(move || {
                    for n in 0..10 {
                        logger.info(Facility::Producer, &format!("Producer[{}] op {}", id, n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(logging.overruns(), 0);
        logging.shutdown();
        assert_eq!(lines.lock().unwrap().len(), 30);
    }
}
