use std::time::{Duration, Instant};

/// A single-shot cancellable deadline.
///
/// The session arms one of these per debounce concern and the daemon loop
/// drives firing: `deadline()` feeds the loop's sleep, `fire_if_due()` is
/// called when the sleep elapses. Arming again replaces the old deadline.
#[derive(Debug, Default)]
pub struct Alarm {
    deadline: Option<Instant>,
}

impl Alarm {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Schedule the alarm `delay` after `now`, replacing any earlier deadline.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Idempotent; fine to call when not pending.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed. Returns true at most once per arm.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel and report whether the alarm was still pending. Used to flush a
    /// pending debounce synchronously at drop time.
    pub fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
