//! Time source abstraction.
//!
//! The redemption service reads the clock exactly once per attempt and hands
//! the timestamp down to the store, so TTL behavior is testable without real
//! delays. Stores never read the clock themselves.

use chrono::{DateTime, Utc};

/// Supplies the current time for TTL comparisons.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. TTLs are human-scale (minutes), so wall time is fine here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
