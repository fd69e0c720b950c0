// SPDX-License-Identifier: Apache-2.0 OR MIT
use serde::Serialize;

use super::WorkerId;

/// What one worker did over its lifetime, returned when its thread is joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub worker: WorkerId,
    /// Completed inserts (producer) or removes (consumer)
    pub operations: u64,
    pub last_value: Option<u32>,
    pub last_index: Option<usize>,
}

impl WorkerSummary {
    pub fn new(worker: WorkerId) -> Self {
        Self {
            worker,
            operations: 0,
            last_value: None,
            last_index: None,
        }
    }

    pub fn record(&mut self, index: usize, value: Option<u32>) {
        self.operations += 1;
        self.last_index = Some(index);
        if value.is_some() {
            self.last_value = value;
        }
    }
}

impl std::fmt::Display for WorkerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} operations", self.worker, self.operations)?;
        if let Some(value) = self.last_value {
            write!(f, ", last value 0x{:08x}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::Role;

    #[test]
    fn test_record_and_display() {
        let mut summary = WorkerSummary::new(WorkerId::new(Role::Consumer, 2));
        assert_eq!(summary.to_string(), "Consumer[2]: 0 operations");

        summary.record(4, Some(0xabcd));
        summary.record(5, None);
        assert_eq!(summary.operations, 2);
        assert_eq!(summary.last_index, Some(5));
        assert_eq!(
            summary.to_string(),
            "Consumer[2]: 2 operations, last value 0x0000abcd"
        );
    }
}
