//! Wall-clock sources.
//!
//! Every aggregate takes `now` as an argument; only the [`Simulation`]
//! context reads a [`Clock`]. Tests drive time with [`ManualClock`].
//!
//! [`Simulation`]: crate::sim::Simulation

use crate::fixed::{Millis, Timestamp, secs_to_millis};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Reads the operating system clock (milliseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0);
        Timestamp(ms)
    }
}

/// A hand-driven clock. Clones share the same time, so a test can keep one
/// handle while the simulation owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.set(now.millis());
    }

    pub fn advance_millis(&self, ms: Millis) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_millis(secs_to_millis(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance_secs(2);
        assert_eq!(clock.now(), Timestamp(3_000));
        clock.set(Timestamp(10));
        assert_eq!(handle.now(), Timestamp(10));
    }

    #[test]
    fn system_clock_is_past_epoch() {
        assert!(SystemClock.now() > Timestamp::ZERO);
    }
}
