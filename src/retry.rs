//! Bounded polling for state that converges asynchronously.
use std::thread;
use std::time::{Duration, Instant};

/// Interval and overall budget for one convergence check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn attempt(&self, condition: impl FnMut() -> bool) -> bool {
        attempt(condition, self.interval, self.timeout)
    }
}

/// Poll `condition` every `interval` until it holds or `timeout` elapses.
///
/// The condition is always evaluated at least once, and the final sleep is
/// clipped to the deadline.
pub fn attempt(mut condition: impl FnMut() -> bool, interval: Duration, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(interval.min(deadline - now));
    }
}
