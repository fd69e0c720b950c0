// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Counting gates that regulate entry into the critical section.
//!
//! A [`Gate`] is a counting semaphore built from a `Mutex` and a `Condvar`.
//! [`OccupancyGate`] pairs two of them: producers wait on "empty slots",
//! consumers wait on "filled slots", so the two roles never block on the same
//! condition.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Returned by acquires once the gate has been closed for shutdown
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("gate closed")]
pub struct GateClosed;

#[derive(Debug)]
struct GateState {
    count: usize,
    closed: bool,
}

/// Counting semaphore with a shutdown switch
#[derive(Debug)]
pub struct Gate {
    state: Mutex<GateState>,
    available: Condvar,
}

impl Gate {
    pub fn new(initial: usize) -> Self {
        Self {
            state: Mutex::new(GateState {
                count: initial,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // The state is two plain fields updated without any call that can panic
    // in between, so a poisoned guard still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the count is positive, then decrement it.
    pub fn acquire(&self) -> Result<(), GateClosed> {
        let state = self.lock();
        let mut state = self
            .available
            .wait_while(state, |s| s.count == 0 && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(GateClosed);
        }
        state.count -= 1;
        Ok(())
    }

    /// Increment the count and wake one waiter.
    pub fn release(&self) {
        let mut state = self.lock();
        state.count += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Fail every pending and future acquire.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn count(&self) -> usize {
        self.lock().count
    }
}

/// The pair of gates guarding a ring of `capacity` slots
#[derive(Debug)]
pub struct OccupancyGate {
    capacity: usize,
    empty: Gate,
    filled: Gate,
}

impl OccupancyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            empty: Gate::new(capacity),
            filled: Gate::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Producer side: wait for a free slot
    pub fn acquire_empty(&self) -> Result<(), GateClosed> {
        self.empty.acquire()
    }

    /// Consumer side: announce a vacated slot
    pub fn release_empty(&self) {
        self.empty.release();
    }

    /// Consumer side: wait for a filled slot
    pub fn acquire_filled(&self) -> Result<(), GateClosed> {
        self.filled.acquire()
    }

    /// Producer side: announce a filled slot
    pub fn release_filled(&self) {
        self.filled.release();
    }

    pub fn close(&self) {
        self.empty.close();
        self.filled.close();
    }

    pub fn is_closed(&self) -> bool {
        self.empty.is_closed()
    }

    pub fn empty_count(&self) -> usize {
        self.empty.count()
    }

    pub fn filled_count(&self) -> usize {
        self.filled.count()
    }

    /// `empty + filled == capacity`; only meaningful while no worker is
    /// between an acquire and its matching release.
    pub fn is_balanced(&self) -> bool {
        self.empty_count() + self.filled_count() == self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_release_counts() {
        let gate = Gate::new(2);
        gate.acquire().unwrap();
        gate.acquire().unwrap();
        assert_eq!(gate.count(), 0);

        gate.release();
        assert_eq!(gate.count(), 1);
        gate.acquire().unwrap();
        assert_eq!(gate.count(), 0);
    }

    #[test]
    fn test_release_wakes_blocked_waiter() {
        let gate = Arc::new(Gate::new(0));
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.acquire())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        gate.release();
        assert_eq!(waiter.join().unwrap(), Ok(()));
        assert_eq!(gate.count(), 0);
    }

    #[test]
    fn test_close_releases_all_waiters() {
        let gate = Arc::new(Gate::new(0));
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.acquire())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        gate.close();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Err(GateClosed));
        }
        // Closed wins over an available count
        gate.release();
        assert_eq!(gate.acquire(), Err(GateClosed));
    }

    #[test]
    fn test_occupancy_gate_starts_balanced() {
        let gate = OccupancyGate::new(9);
        assert_eq!(gate.empty_count(), 9);
        assert_eq!(gate.filled_count(), 0);
        assert!(gate.is_balanced());

        gate.acquire_empty().unwrap();
        assert!(!gate.is_balanced());
        gate.release_filled();
        assert!(gate.is_balanced());
        assert_eq!(gate.filled_count(), 1);
    }

    #[test]
    fn test_consumer_blocks_on_empty_ring() {
        let gate = Arc::new(OccupancyGate::new(3));
        let consumer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.acquire_filled())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!consumer.is_finished());

        gate.acquire_empty().unwrap();
        gate.release_filled();
        assert_eq!(consumer.join().unwrap(), Ok(()));
        assert_eq!(gate.filled_count(), 0);
    }
}
