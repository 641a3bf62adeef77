// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Counts jobs that were accepted but have not finished yet.
///
/// `add` must happen before the job becomes visible to any worker, `done`
/// exactly once after the job returned. Waiters are woken when the count
/// drops to zero.
#[derive(Debug, Default)]
pub struct PendingWork {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self) {
        *self.lock() += 1;
    }

    /// Marks one job as finished.
    ///
    /// # Panics
    /// If there is no matching `add`. That is a bug in the caller.
    pub fn done(&self) {
        let mut count = self.lock();
        if *count == 0 {
            drop(count);
            panic!("PendingWork::done called without a matching add");
        }
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *self.lock()
    }

    /// Blocks until the count is zero.
    pub fn wait(&self) {
        // pattern is described on https://doc.rust-lang.org/stable/std/sync/struct.Condvar.html
        let count = self.lock();
        let _count = self
            .drained
            .wait_while(count, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`PendingWork::wait`] but gives up after `timeout`.
    /// Returns `true` if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = self.lock();
        let (count, _) = self
            .drained
            .wait_timeout_while(count, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // the guarded value is a plain integer, a poisoned lock still holds a valid count
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_returns_immediately_when_idle() {
        let pending = PendingWork::new();
        pending.wait();
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn test_wait_blocks_until_done() {
        let pending = Arc::new(PendingWork::new());
        pending.add();
        pending.add();

        let p = pending.clone();
        let finisher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            p.done();
            thread::sleep(Duration::from_millis(100));
            p.done();
        });

        let started = Instant::now();
        pending.wait();
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(pending.count(), 0);
        finisher.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_reports_outstanding_work() {
        let pending = PendingWork::new();
        pending.add();
        assert!(!pending.wait_timeout(Duration::from_millis(20)));
        pending.done();
        assert!(pending.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    #[should_panic(expected = "without a matching add")]
    fn test_done_without_add_panics() {
        PendingWork::new().done();
    }
}
