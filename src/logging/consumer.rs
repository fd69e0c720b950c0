// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log consumer thread - drains the log ring and outputs entries

use super::entry::LogEntry;
use super::ringbuffer::LogRing;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const IDLE_POLL: Duration = Duration::from_millis(1);

/// Output sink for log entries
pub trait LogSink: Send {
    fn write_entry(&mut self, entry: &LogEntry);

    fn flush(&mut self);
}

/// Format: [SEVERITY] [Facility] message key1=value1 key2=value2
fn format_entry(entry: &LogEntry) -> String {
    let kvs = entry.get_kvs();
    if kvs.is_empty() {
        format!(
            "[{:?}] [{}] {}",
            entry.severity,
            entry.facility.as_str(),
            entry.get_message()
        )
    } else {
        let kv_str: Vec<String> = kvs.iter().map(|kv| format!("{:?}", kv)).collect();
        format!(
            "[{:?}] [{}] {} {}",
            entry.severity,
            entry.facility.as_str(),
            entry.get_message(),
            kv_str.join(" ")
        )
    }
}

/// Standard output sink
pub struct StdoutSink {
    stdout: std::io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn write_entry(&mut self, entry: &LogEntry) {
        let _ = writeln!(self.stdout, "{}", format_entry(entry));
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// Consumer loop for the log ring, run on its own thread
pub struct BlockingConsumer {
    ring: Arc<LogRing>,
    sink: Box<dyn LogSink>,
    running: Arc<AtomicBool>,
}

impl BlockingConsumer {
    pub fn new(ring: Arc<LogRing>, sink: Box<dyn LogSink>) -> Self {
        Self {
            ring,
            sink,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a handle to stop the consumer
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Drain everything currently in the ring. Returns whether anything was read.
    fn drain(&mut self) -> bool {
        let mut any_read = false;
        while let Some(entry) = self.ring.read() {
            self.sink.write_entry(&entry);
            any_read = true;
        }
        if any_read {
            self.sink.flush();
        }
        any_read
    }

    /// Run until stopped, then drain whatever is left.
    pub fn run(mut self) {
        while self.running.load(Ordering::Acquire) {
            if !self.drain() {
                std::thread::sleep(IDLE_POLL);
            }
        }

        self.drain();
        self.sink.flush();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logging::{Facility, Severity};
    use std::sync::Mutex;

    /// Sink that captures formatted lines for assertions
    pub(crate) struct CaptureSink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl CaptureSink {
        pub(crate) fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
            let lines = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    lines: Arc::clone(&lines),
                },
                lines,
            )
        }
    }

    impl LogSink for CaptureSink {
        fn write_entry(&mut self, entry: &LogEntry) {
            self.lines.lock().unwrap().push(format_entry(entry));
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn test_format_entry() {
        let mut entry = LogEntry::new(Severity::Info, Facility::Producer, "insert");
        assert_eq!(format_entry(&entry), "[Info] [Producer] insert");

        entry.add_kv("slot", "3");
        assert_eq!(format_entry(&entry), "[Info] [Producer] insert slot=3");
    }

    #[test]
    fn test_blocking_consumer_drains_on_stop() {
        let ring = Arc::new(LogRing::new(16));
        let (sink, lines) = CaptureSink::new();

        ring.write(LogEntry::new(Severity::Info, Facility::Test, "Message 1"));
        ring.write(LogEntry::new(Severity::Error, Facility::Test, "Message 2"));

        let consumer = BlockingConsumer::new(Arc::clone(&ring), Box::new(sink));
        let stop = consumer.stop_handle();
        // Stopped before it starts: the final drain must still see both entries
        stop.store(false, Ordering::Release);

        let handle = std::thread::spawn(move || consumer.run());
        handle.join().unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Message 1"));
        assert!(lines[1].contains("Message 2"));
    }
}
