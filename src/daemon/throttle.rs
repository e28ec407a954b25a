//! Minimum-spacing gate for event triggers.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Lets an activation through only if none was let through within `period`.
///
/// The first activation always passes. Rejected activations are dropped, not
/// deferred, and do not move the window.
#[derive(Debug)]
pub struct Throttle {
    period: Duration,
    last_pass: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_pass: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns true and records the pass if the activation may proceed
    pub fn try_pass(&self) -> bool {
        let now = Instant::now();
        let mut last_pass = self
            .last_pass
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match *last_pass {
            Some(last) if now.duration_since(last) <= self.period => false,
            _ => {
                *last_pass = Some(now);
                true
            }
        }
    }
}
