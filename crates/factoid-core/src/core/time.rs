// crates/factoid-core/src/core/time.rs
// ============================================================================
// Module: Factoid Time Model
// Description: Epoch-second timestamps and the clock abstraction.
// Purpose: Stamp factoids with second resolution without hard-wiring wall time.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Factoids record when they were added as unix epoch seconds. The store
//! facade reads time only through a [`Clock`], so hosts and tests can supply
//! deterministic values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use ::time::OffsetDateTime;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch timestamp with second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixSeconds(i64);

impl UnixSeconds {
    /// Creates a timestamp from epoch seconds.
    #[must_use]
    pub const fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Returns the raw epoch seconds.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Converts to a UTC date-time for human-facing rendering.
    ///
    /// Returns `None` when the stored value is outside the supported range.
    #[must_use]
    pub fn to_offset_datetime(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.0).ok()
    }
}

impl fmt::Display for UnixSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time for factoid stamping.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> UnixSeconds;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixSeconds {
        UnixSeconds(OffsetDateTime::now_utc().unix_timestamp())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::Clock;
    use super::SystemClock;
    use super::UnixSeconds;

    #[test]
    fn converts_epoch_seconds_to_datetime() {
        let stamp = UnixSeconds::new(1_000_000_000);
        let datetime = stamp.to_offset_datetime().unwrap();
        assert_eq!(datetime.year(), 2001);
        assert_eq!(datetime.unix_timestamp(), 1_000_000_000);
    }

    #[test]
    fn out_of_range_timestamp_has_no_datetime() {
        assert!(UnixSeconds::new(i64::MAX).to_offset_datetime().is_none());
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now().get() > 0);
    }
}
