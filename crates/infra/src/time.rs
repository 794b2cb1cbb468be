//! Wall clock abstraction.

use chrono::Utc;

/// Source of the current Unix time, in seconds.
pub trait Clock: Send + Sync {
    fn unix_now(&self) -> i64;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        Utc::now().timestamp()
    }
}
