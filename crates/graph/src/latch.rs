// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

///
/// A StopLatch is a simple condition that can be triggered once to signal any
/// waiters that they should stop. Roughly equivalent to Java's
/// `CountDownLatch` with a count of 1, without the ability to "clear" the
/// condition once triggered.
///
/// The deletion loop polls this only at outer-iteration boundaries (never
/// mid-phase: §5 guarantees an in-flight deleter always runs to completion),
/// so triggering it asks the loop to stop before starting its next outer
/// iteration rather than cancelling anything in flight.
///
#[derive(Clone)]
pub struct StopLatch {
    triggered: Arc<AtomicBool>,
}

impl StopLatch {
    pub fn new() -> StopLatch {
        StopLatch {
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark this latch triggered. All calls after the first are noops.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    /// True if the latch has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for StopLatch {
    fn default() -> StopLatch {
        StopLatch::new()
    }
}

#[cfg(test)]
mod tests {
    use super::StopLatch;

    #[test]
    fn starts_untriggered() {
        let latch = StopLatch::new();
        assert!(!latch.is_triggered());
    }

    #[test]
    fn trigger_is_observable_and_idempotent() {
        let latch = StopLatch::new();
        latch.trigger();
        latch.trigger();
        assert!(latch.is_triggered());
    }

    #[test]
    fn clones_share_state() {
        let latch = StopLatch::new();
        let other = latch.clone();
        latch.trigger();
        assert!(other.is_triggered());
    }
}
