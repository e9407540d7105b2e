use std::time::Duration;

use tokio::time::Instant;

/// Latest-value-wins queue for rate-limited remote mutations.
///
/// A pushed value becomes sendable once `window` has passed without another
/// push. At most one value is in flight at a time; pushing while one is in
/// flight replaces the queued value, never the in-flight one.
#[derive(Debug)]
pub struct Coalescer<T> {
    window: Duration,
    queued: Option<T>,
    due: Option<Instant>,
    in_flight: bool,
}

impl<T> Coalescer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            queued: None,
            due: None,
            in_flight: false,
        }
    }

    /// Queues `value` and restarts the quiet window. Returns the value it
    /// displaced, if any.
    pub fn push(&mut self, value: T, now: Instant) -> Option<T> {
        self.due = Some(now + self.window);
        self.queued.replace(value)
    }

    /// When the queued value may be sent, `None` while nothing is sendable.
    pub fn deadline(&self) -> Option<Instant> {
        if self.in_flight || self.queued.is_none() {
            return None;
        }
        self.due
    }

    /// Moves the queued value in flight if its window has passed.
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(due) if due <= now => {
                self.due = None;
                self.in_flight = true;
                self.queued.take()
            }
            _ => None,
        }
    }

    /// Marks the in-flight value as resolved.
    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    pub fn has_queued(&self) -> bool {
        self.queued.is_some()
    }

    /// Drops everything, returning the queued value.
    pub fn clear(&mut self) -> Option<T> {
        self.in_flight = false;
        self.due = None;
        self.queued.take()
    }
}
