// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logger handle and its writers

use super::entry::LogEntry;
use super::ringbuffer::LogRing;
use super::{Facility, Severity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type FacilityLevels = Arc<RwLock<HashMap<Facility, Severity>>>;

/// Destination a [`Logger`] hands finished entries to
pub trait LogWriter: Send + Sync {
    fn write(&self, entry: LogEntry);
}

impl LogWriter for LogRing {
    fn write(&self, entry: LogEntry) {
        LogRing::write(self, entry);
    }
}

/// Writes one JSON object per entry straight to stderr (no ring, no consumer)
pub struct StderrJsonWriter;

impl LogWriter for StderrJsonWriter {
    fn write(&self, entry: LogEntry) {
        let kvs: serde_json::Map<String, serde_json::Value> = entry
            .get_kvs()
            .iter()
            .map(|kv| (kv.key().to_string(), kv.value().into()))
            .collect();
        let log_msg = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": entry.severity,
            "facility": entry.facility,
            "thread": entry.thread_id,
            "message": entry.get_message(),
            "fields": kvs,
        });
        eprintln!("{}", log_msg);
    }
}

/// Discards everything
pub struct NullWriter;

impl LogWriter for NullWriter {
    fn write(&self, _entry: LogEntry) {}
}

/// Logger handle for writing log entries
///
/// Cheap to clone; every clone shares the writer and the level filters, so a
/// level change made through one handle is seen by all of them.
#[derive(Clone)]
pub struct Logger {
    writer: Arc<dyn LogWriter>,
    /// Global minimum log level
    global_min_level: Arc<AtomicU8>,
    /// Per-facility minimum log levels (override the global level)
    facility_min_levels: FacilityLevels,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("global_min_level", &self.global_level())
            .finish_non_exhaustive()
    }
}

impl Logger {
    pub fn new(writer: Arc<dyn LogWriter>, level: Severity) -> Self {
        Self {
            writer,
            global_min_level: Arc::new(AtomicU8::new(level.as_u8())),
            facility_min_levels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Logger feeding a ring drained by a consumer thread
    pub fn from_ring(ring: Arc<LogRing>, level: Severity) -> Self {
        Self::new(ring as Arc<dyn LogWriter>, level)
    }

    /// Logger that writes JSON directly to stderr
    pub fn stderr_json() -> Self {
        Self::new(Arc::new(StderrJsonWriter), Severity::Info)
    }

    /// Logger that drops every entry
    pub fn null() -> Self {
        Self::new(Arc::new(NullWriter), Severity::Emergency)
    }

    #[inline]
    fn should_log(&self, severity: Severity, facility: Facility) -> bool {
        let levels = self
            .facility_min_levels
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(&min_level) = levels.get(&facility) {
            return severity <= min_level;
        }
        drop(levels);

        severity.as_u8() <= self.global_min_level.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn log(&self, severity: Severity, facility: Facility, message: &str) {
        if !self.should_log(severity, facility) {
            return;
        }
        self.writer.write(LogEntry::new(severity, facility, message));
    }

    /// Write a log entry with key-value pairs (at most two are kept)
    #[inline]
    pub fn log_kv(
        &self,
        severity: Severity,
        facility: Facility,
        message: &str,
        kvs: &[(&str, &str)],
    ) {
        if !self.should_log(severity, facility) {
            return;
        }

        let mut entry = LogEntry::new(severity, facility, message);
        for (key, value) in kvs {
            entry.add_kv(key, value);
        }
        self.writer.write(entry);
    }

    #[inline]
    pub fn error(&self, facility: Facility, message: &str) {
        self.log(Severity::Error, facility, message);
    }

    #[inline]
    pub fn warning(&self, facility: Facility, message: &str) {
        self.log(Severity::Warning, facility, message);
    }

    #[inline]
    pub fn notice(&self, facility: Facility, message: &str) {
        self.log(Severity::Notice, facility, message);
    }

    #[inline]
    pub fn info(&self, facility: Facility, message: &str) {
        self.log(Severity::Info, facility, message);
    }

    #[inline]
    pub fn debug(&self, facility: Facility, message: &str) {
        self.log(Severity::Debug, facility, message);
    }

    pub fn set_global_level(&self, level: Severity) {
        self.global_min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn global_level(&self) -> Severity {
        Severity::from_u8(self.global_min_level.load(Ordering::Relaxed)).unwrap_or(Severity::Info)
    }

    pub fn set_facility_level(&self, facility: Facility, level: Severity) {
        self.facility_min_levels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(facility, level);
    }

    /// Clear the facility-specific level (fall back to global)
    pub fn clear_facility_level(&self, facility: Facility) {
        self.facility_min_levels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&facility);
    }

    /// Effective level for `facility`: its override if set, else the global level.
    pub fn facility_level(&self, facility: Facility) -> Severity {
        self.facility_min_levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&facility)
            .copied()
            .unwrap_or_else(|| self.global_level())
    }
}
