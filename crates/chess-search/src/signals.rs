//! Stop and ponder signalling between the front end and the search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared handle through which a running search is stopped or told that
/// pondering has ended. The stop flag is polled by the search; the ponder
/// state is waited on.
#[derive(Debug, Default)]
pub struct SearchSignals {
    stop: AtomicBool,
    pondering: Mutex<bool>,
    changed: Condvar,
}

impl SearchSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the stop flag before a new search.
    pub fn reset(&self, pondering: bool) {
        self.stop.store(false, Ordering::Relaxed);
        *self.lock() = pondering;
    }

    /// Asks the search to finish as soon as possible. Also ends pondering.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        *self.lock() = false;
        self.changed.notify_all();
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// The opponent played the expected move.
    pub fn ponder_hit(&self) {
        *self.lock() = false;
        self.changed.notify_all();
    }

    pub fn is_pondering(&self) -> bool {
        *self.lock()
    }

    /// Blocks until pondering ends or `timeout` passes. Returns whether
    /// the search is still pondering.
    pub fn wait_while_pondering(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |pondering| *pondering)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.pondering.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn stop_and_reset() {
        let signals = SearchSignals::new();
        assert!(!signals.is_stopped());
        signals.stop();
        assert!(signals.is_stopped());
        signals.reset(true);
        assert!(!signals.is_stopped());
        assert!(signals.is_pondering());
    }

    #[test]
    fn wait_times_out_while_pondering() {
        let signals = SearchSignals::new();
        signals.reset(true);
        let start = Instant::now();
        assert!(signals.wait_while_pondering(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn ponder_hit_wakes_the_waiter() {
        let signals = Arc::new(SearchSignals::new());
        signals.reset(true);
        let waiter = {
            let signals = Arc::clone(&signals);
            thread::spawn(move || signals.wait_while_pondering(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(10));
        signals.ponder_hit();
        assert!(!waiter.join().unwrap());
        assert!(!signals.is_stopped());
    }

    #[test]
    fn stop_ends_pondering() {
        let signals = SearchSignals::new();
        signals.reset(true);
        signals.stop();
        assert!(!signals.wait_while_pondering(Duration::from_secs(30)));
    }
}
