// SPDX-License-Identifier: Apache-2.0 OR MIT
// Bounded lossy ring for log entries
//
// Writers never block: when the ring is full the oldest entry is displaced and
// counted as an overrun. A single consumer thread drains it.

use super::entry::LogEntry;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Multiple-producer single-consumer log ring
pub struct LogRing {
    entries: ArrayQueue<LogEntry>,
    write_seq: AtomicU64,
    overruns: AtomicU64,
}

impl LogRing {
    /// # Panics
    /// Panics if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: ArrayQueue::new(capacity),
            write_seq: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
        }
    }

    /// Append an entry, displacing the oldest one on overflow.
    pub fn write(&self, mut entry: LogEntry) {
        entry.sequence = self.write_seq.fetch_add(1, Ordering::Relaxed);
        if self.entries.force_push(entry).is_some() {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn read(&self) -> Option<LogEntry> {
        self.entries.pop()
    }

    /// Number of entries dropped because the ring was full
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
