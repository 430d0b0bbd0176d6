//! Time sources and the scheduled-callback primitives the player is built on.
//!
//! Nothing in the engine sleeps or spawns timers. Every timer is a value that
//! is polled with the current time, so tests can drive a [`ManualClock`]
//! instead of waiting on wall-clock time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic milliseconds since an arbitrary origin.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-advanced clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// A repeating timer. Fires at most once per poll; missed periods are skipped
/// rather than replayed because every consumer recomputes from timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    next_due_ms: u64,
}

impl Interval {
    /// First firing happens one period after `now_ms`.
    pub fn start(now_ms: u64, period_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due_ms: now_ms + period_ms,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        while self.next_due_ms <= now_ms {
            self.next_due_ms += self.period_ms;
        }
        true
    }
}

/// A one-shot timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at_ms: u64,
}

impl Deadline {
    pub fn after(now_ms: u64, delay_ms: u64) -> Self {
        Self {
            at_ms: now_ms + delay_ms,
        }
    }

    pub fn at_ms(&self) -> u64 {
        self.at_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.at_ms
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.at_ms.saturating_sub(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 250);
        other.set(1_000);
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[test]
    fn interval_fires_once_per_period() {
        let mut interval = Interval::start(0, 100);
        assert!(!interval.poll(50));
        assert!(interval.poll(100));
        assert!(!interval.poll(150));
        assert!(interval.poll(200));
    }

    #[test]
    fn interval_skips_missed_periods() {
        let mut interval = Interval::start(0, 100);
        assert!(interval.poll(1_050));
        assert!(!interval.poll(1_099));
        assert!(interval.poll(1_100));
    }

    #[test]
    fn zero_period_is_lifted() {
        let interval = Interval::start(10, 0);
        assert_eq!(interval.period_ms(), 1);
    }

    #[test]
    fn deadline_reports_remaining_time() {
        let deadline = Deadline::after(1_000, 1_500);
        assert!(!deadline.is_due(2_499));
        assert_eq!(deadline.remaining_ms(2_000), 500);
        assert!(deadline.is_due(2_500));
        assert_eq!(deadline.remaining_ms(3_000), 0);
    }
}
