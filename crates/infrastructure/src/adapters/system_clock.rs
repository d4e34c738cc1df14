//! System clock adapter

use chrono::{DateTime, Utc};
use tokenrelay_application::ports::Clock;

/// Wall clock used for token expiry and publish timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
