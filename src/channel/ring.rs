// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Fixed-capacity circular slot storage.
//!
//! The ring itself is not synchronized. It lives inside the channel's mutex,
//! and the occupancy gates guarantee that the write cursor only ever lands on
//! an empty slot and the read cursor on a filled one. The ring still checks
//! both preconditions and reports a [`ProtocolViolation`] instead of trusting
//! the caller.

use serde::Serialize;
use thiserror::Error;

/// State of one ring slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Slot {
    Empty,
    Filled(u32),
}

impl Slot {
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            Slot::Filled(value) => Some(*value),
            Slot::Empty => None,
        }
    }
}

/// Evidence that the gate discipline was broken
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("insert into full buffer at slot {index}")]
    InsertIntoFull { index: usize },

    #[error("remove from empty buffer at slot {index}")]
    RemoveFromEmpty { index: usize },
}

/// Which cursor an access went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Insert,
    Remove,
}

/// Result of one insert or remove: the slot touched and what it held before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAccess {
    pub kind: Access,
    pub index: usize,
    pub previous: Slot,
}

impl SlotAccess {
    /// `Some` when the slot was not in the state the access requires.
    pub fn violation(&self) -> Option<ProtocolViolation> {
        match (self.kind, self.previous) {
            (Access::Insert, Slot::Filled(_)) => {
                Some(ProtocolViolation::InsertIntoFull { index: self.index })
            }
            (Access::Remove, Slot::Empty) => {
                Some(ProtocolViolation::RemoveFromEmpty { index: self.index })
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct RingBuffer {
    slots: Box<[Slot]>,
    write_cursor: usize,
    read_cursor: usize,
    filled: usize,
}

impl RingBuffer {
    /// # Panics
    /// Panics if `capacity` is zero; the channel validates it first.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            slots: vec![Slot::Empty; capacity].into_boxed_slice(),
            write_cursor: 0,
            read_cursor: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of `Filled` slots
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Store `value` at the write cursor and advance it.
    ///
    /// A filled target slot is overwritten and reported through
    /// [`SlotAccess::violation`].
    pub fn insert(&mut self, value: u32) -> SlotAccess {
        let index = self.write_cursor;
        let previous = std::mem::replace(&mut self.slots[index], Slot::Filled(value));
        if !previous.is_filled() {
            self.filled += 1;
        }
        self.write_cursor = (index + 1) % self.slots.len();

        SlotAccess {
            kind: Access::Insert,
            index,
            previous,
        }
    }

    /// Clear the slot at the read cursor and advance it.
    pub fn remove(&mut self) -> SlotAccess {
        let index = self.read_cursor;
        let previous = std::mem::replace(&mut self.slots[index], Slot::Empty);
        if previous.is_filled() {
            self.filled -= 1;
        }
        self.read_cursor = (index + 1) % self.slots.len();

        SlotAccess {
            kind: Access::Remove,
            index,
            previous,
        }
    }

    /// Copy of every slot in index order
    pub fn snapshot(&self) -> Vec<Slot> {
        self.slots.to_vec()
    }
}
