use crate::traits::Clock;
use std::time::{Duration, Instant};

/// Wall-clock source for frame gaps, backed by `Instant` so that clock steps
/// (NTP, manual changes) never show up as jitter.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = clock.now();
        assert!(t2 > t1, "Monotonic clock should advance");
        assert!(t2 - t1 >= Duration::from_millis(10));
    }
}
