//! Trailing-edge debounce as a pure state machine.
//!
//! The caller supplies every timestamp, so tests can drive the state
//! machine with a logical clock instead of sleeping through real windows.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Record a trigger at `now`. Each notification pushes the deadline out
    /// by a full quiet window, so only the last one in a burst fires.
    pub fn notify(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// True while a trigger is recorded but has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// How long until the pending trigger is due, if any.
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire the pending trigger if its quiet window has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending trigger without firing it.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
