//! This module manages the context in which the simulator performs a
//! single operation.
//!
//! A call into the simulator represents an opportunity to advance the
//! machine by one half-step.  The simulator mostly cares about how
//! much time would have elapsed for the machine it is emulating (that
//! is what paces collaborators and the speed-multiplier logic), but
//! the caller also keeps track of actual elapsed time.  To avoid
//! confusing two related quantities of the same type, we keep them
//! together in a struct with very clear names.
use core::time::Duration;

#[derive(Debug)]
pub struct Context {
    pub simulated_time: Duration,
    pub real_elapsed_time: Duration,
}

impl Context {
    #[must_use]
    pub fn new(simulated_time: Duration, real_elapsed_time: Duration) -> Context {
        Context {
            simulated_time,
            real_elapsed_time,
        }
    }
}
