//! Clock abstraction and time arithmetic for the pipeline.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
///
/// The gateway stamps `receivedAtUtc` and the processor stamps
/// `processedUtc` through this seam so tests can pin both.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Non-negative seconds from `earlier` to `later`.
///
/// Lag and freshness observations mix timestamps from different hosts;
/// skew can put `earlier` in the future, which clamps to zero instead of
/// going negative.
#[must_use]
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).to_std().map_or(0.0, |d| d.as_secs_f64())
}
