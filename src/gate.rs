use std::time::{Duration, Instant};

/// Change-or-heartbeat gate in front of the lamp.
///
/// A change in the active count is pushed immediately; an unchanged count is
/// still re-pushed once per refresh interval so the device recovers from a
/// missed update. Everything in between is suppressed.
pub struct UpdateGate {
    refresh_interval: Duration,
    last_count: Option<usize>,
    last_emit: Option<Instant>,
}

impl UpdateGate {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            last_count: None,
            last_emit: None,
        }
    }

    /// Decides whether `count` is worth emitting at `now`, and records the
    /// emission when it is. The very first call always emits.
    pub fn should_emit(&mut self, count: usize, now: Instant) -> bool {
        let due = match (self.last_count, self.last_emit) {
            (Some(last_count), Some(last_emit)) => {
                count != last_count || now >= last_emit + self.refresh_interval
            }
            _ => true,
        };

        if due {
            self.last_count = Some(count);
            self.last_emit = Some(now);
        }
        due
    }
}
