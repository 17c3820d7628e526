//! Pacing the simulation against wall-clock time.

use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{event, Level};

/// MinimalSleeper keeps the simulation's average speed right while
/// being economical with system calls: a two-microsecond half-step is
/// far below any useful sleep granularity, so the debt is accumulated
/// and paid off in larger lumps.  The debt can go negative when the
/// operating system oversleeps, in which case subsequent calls simply
/// don't sleep until the balance recovers.
#[derive(Debug)]
pub struct MinimalSleeper {
    /// Smallest sleep worth actually performing.
    min_sleep: Duration,
    /// Outstanding sleep debt in nanoseconds; negative means we have
    /// overslept.
    debt_nanos: i128,
    total_cumulative_sleep: Duration,
}

impl MinimalSleeper {
    #[must_use]
    pub fn new(min_sleep: Duration) -> MinimalSleeper {
        MinimalSleeper {
            min_sleep,
            debt_nanos: 0,
            total_cumulative_sleep: Duration::ZERO,
        }
    }

    pub fn sleep(&mut self, duration: Duration) {
        self.debt_nanos += duration.as_nanos() as i128;
        if self.debt_nanos > self.min_sleep.as_nanos() as i128 {
            self.really_sleep();
        }
    }

    fn really_sleep(&mut self) {
        let owed = Duration::from_nanos(self.debt_nanos as u64);
        let before = Instant::now();
        sleep(owed);
        let slept = before.elapsed();
        self.total_cumulative_sleep += slept;
        self.debt_nanos -= slept.as_nanos() as i128;
        event!(
            Level::TRACE,
            "owed {owed:?}, slept {slept:?}, remaining debt {} ns",
            self.debt_nanos
        );
    }
}

impl Drop for MinimalSleeper {
    fn drop(&mut self) {
        event!(
            Level::DEBUG,
            "MinimalSleeper: total cumulative sleep was {:?}",
            self.total_cumulative_sleep
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debt_accumulates_without_sleeping() {
        let mut sleeper = MinimalSleeper::new(Duration::from_secs(3600));
        // Far below the threshold: must return immediately.
        let before = Instant::now();
        for _ in 0..1000 {
            sleeper.sleep(Duration::from_micros(1));
        }
        assert!(before.elapsed() < Duration::from_secs(1));
        assert_eq!(sleeper.debt_nanos, 1000 * 1000);
    }
}
