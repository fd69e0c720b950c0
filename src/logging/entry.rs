// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log entry structure

use super::{Facility, Severity};

/// Maximum message length kept in an entry; longer messages are truncated.
pub const MAX_MESSAGE_LEN: usize = 160;
/// Maximum number of key-value pairs attached to one entry.
pub const MAX_KVS: usize = 2;

/// Key-value pair for structured logging
#[derive(Clone, PartialEq, Eq)]
pub struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A single log record as it travels from a worker thread to the consumer.
#[derive(Clone)]
pub struct LogEntry {
    pub severity: Severity,
    pub facility: Facility,
    /// Assigned by the ring on write
    pub sequence: u64,
    pub thread_id: u32,
    message: String,
    kvs: Vec<KeyValue>,
}

impl LogEntry {
    pub fn new(severity: Severity, facility: Facility, message: &str) -> Self {
        Self {
            severity,
            facility,
            sequence: 0,
            thread_id: current_thread_id(),
            message: truncate_on_char_boundary(message, MAX_MESSAGE_LEN).to_string(),
            kvs: Vec::new(),
        }
    }

    pub fn get_message(&self) -> &str {
        &self.message
    }

    /// Add a key-value pair (pairs beyond [`MAX_KVS`] are dropped)
    pub fn add_kv(&mut self, key: &str, value: &str) {
        if self.kvs.len() < MAX_KVS {
            self.kvs.push(KeyValue::new(key, value));
        }
    }

    pub fn get_kvs(&self) -> &[KeyValue] {
        &self.kvs
    }
}

impl std::fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("LogEntry");
        debug
            .field("severity", &self.severity)
            .field("facility", &self.facility)
            .field("message", &self.message);

        if !self.kvs.is_empty() {
            debug.field("kvs", &self.kvs);
        }

        debug.finish()
    }
}

fn truncate_on_char_boundary(message: &str, max: usize) -> &str {
    if message.len() <= max {
        return message;
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

/// Get current OS thread ID (truncated to u32)
fn current_thread_id() -> u32 {
    #[cfg(target_os = "linux")]
    {
        unsafe { libc::gettid() as u32 }
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}
