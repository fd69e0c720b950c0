// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Cooperative cancellation shared by the supervisor and its workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: AtomicBool,
    lock: Mutex<()>,
    wakeup: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every sleeping worker. Idempotent.
    pub fn trigger(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.triggered.store(true, Ordering::Release);
        self.wakeup.notify_all();
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the sleep was
    /// cut short by [`ShutdownSignal::trigger`].
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_triggered() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            guard = self
                .wakeup
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sleep_runs_to_completion() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(signal.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_trigger_interrupts_sleep() {
        let signal = Arc::new(ShutdownSignal::new());
        let sleeper = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                let start = Instant::now();
                let completed = signal.sleep(Duration::from_secs(30));
                (completed, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(50));
        signal.trigger();

        let (completed, elapsed) = sleeper.join().unwrap();
        assert!(!completed);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
        assert!(!signal.sleep(Duration::from_secs(30)));
    }
}
