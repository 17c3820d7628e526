//! The interrupt synchronizer.
//!
//! The external interrupt-request line is asynchronous to the
//! processor clock.  The real chip resolves this with a pair of
//! flip-flops; here the tolerance window around a clock edge is
//! modelled as a deterministic sampling rule: the line is sampled
//! exactly once per half-step, and the latch sets only on a sampled
//! low-to-high transition.  Holding the line high does not
//! re-trigger, and nothing the line does can start an acknowledge
//! cycle mid-instruction — the timing state machine consults the
//! latch only at instruction boundaries.

use tracing::{event, Level};

#[derive(Debug, Default)]
pub struct InterruptSynchronizer {
    latch: bool,
    previous_level: bool,
}

impl InterruptSynchronizer {
    #[must_use]
    pub fn new() -> InterruptSynchronizer {
        InterruptSynchronizer::default()
    }

    /// Samples the request line.  Called exactly once per half-step;
    /// that fixed sampling point is what replaces the hardware's
    /// metastability window.
    pub fn sample(&mut self, level: bool) {
        if level && !self.previous_level && !self.latch {
            event!(Level::DEBUG, "interrupt request latched");
            self.latch = true;
        }
        self.previous_level = level;
    }

    #[must_use]
    pub fn pending(&self) -> bool {
        self.latch
    }

    /// Clears the latch.  The timing state machine calls this at the
    /// data-transfer commit of the acknowledge cycle, and nowhere
    /// else.
    pub fn acknowledge(&mut self) {
        event!(Level::DEBUG, "interrupt request acknowledged");
        self.latch = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edge_sets_latch() {
        let mut sync = InterruptSynchronizer::new();
        sync.sample(false);
        assert!(!sync.pending());
        sync.sample(true);
        assert!(sync.pending());
    }

    #[test]
    fn test_continuous_assertion_does_not_retrigger() {
        let mut sync = InterruptSynchronizer::new();
        sync.sample(true);
        assert!(sync.pending());
        sync.acknowledge();
        // The line is still high; no new edge, no new request.
        sync.sample(true);
        sync.sample(true);
        assert!(!sync.pending());
        // A fresh edge triggers again.
        sync.sample(false);
        sync.sample(true);
        assert!(sync.pending());
    }

    #[test]
    fn test_latch_survives_line_release() {
        let mut sync = InterruptSynchronizer::new();
        sync.sample(false);
        sync.sample(true);
        sync.sample(false);
        assert!(sync.pending());
    }
}
