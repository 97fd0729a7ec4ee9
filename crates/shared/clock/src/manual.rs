use meridian_core::Timestamp;
use meridian_ports::Clock;
use chrono::{Duration, Utc};
use parking_lot::RwLock;

/// Clock that only moves when told to
///
/// Used to drive the scheduler and the cooldown/force policies deterministically.
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    /// Start at the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move time forward
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.write();
        *current += duration;
    }

    /// Jump to an explicit time
    ///
    /// Warning: moving backwards breaks cooldown arithmetic in consumers.
    pub fn set(&self, time: Timestamp) {
        *self.current.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::starting_now();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now() - t0, Duration::seconds(30));
    }

    #[test]
    fn test_set_time() {
        let clock = ManualClock::starting_now();
        let target = clock.now() + Duration::hours(1);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
