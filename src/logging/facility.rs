// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging facilities (component identifiers)

use serde::{Deserialize, Serialize};

use crate::worker::Role;

/// Logging facility - identifies which component generated the log message
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facility {
    /// Worker lifecycle, startup and shutdown
    Supervisor = 0,
    /// Producer worker loops
    Producer = 1,
    /// Consumer worker loops
    Consumer = 2,
    /// Ring buffer and critical sections
    Channel = 3,
    /// Occupancy gates
    Gate = 4,
    /// Test harness and fixtures
    Test = 12,
}

impl Facility {
    pub const fn as_str(self) -> &'static str {
        match self {
            Facility::Supervisor => "Supervisor",
            Facility::Producer => "Producer",
            Facility::Consumer => "Consumer",
            Facility::Channel => "Channel",
            Facility::Gate => "Gate",
            Facility::Test => "Test",
        }
    }

    /// Facility a worker of the given role reports under.
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Producer => Facility::Producer,
            Role::Consumer => Facility::Consumer,
        }
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facility_for_role() {
        assert_eq!(Facility::for_role(Role::Producer), Facility::Producer);
        assert_eq!(Facility::for_role(Role::Consumer), Facility::Consumer);
        assert_eq!(Facility::Gate.to_string(), "Gate");
    }
}
