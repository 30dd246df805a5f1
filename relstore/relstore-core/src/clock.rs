//! Clock - injectable time source for upload dates.
//!
//! TigerStyle: production reads the system clock, tests drive a `SimClock`
//! whose time only moves forward.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Source of "now" for default upload dates.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as an ISO-8601 string with millisecond precision,
    /// e.g. `2024-06-01T09:30:00.000Z`.
    fn now_iso(&self) -> String {
        format_timestamp(self.now())
    }
}

/// Format a timestamp the way upload dates are persisted.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// SystemClock
// =============================================================================

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// SimClock
// =============================================================================

/// A simulated clock for deterministic tests.
///
/// Shared by reference across a store and the test body, so time is kept in
/// an atomic rather than behind `&mut self`.
#[derive(Debug, Default)]
pub struct SimClock {
    current_ms: AtomicI64,
}

impl SimClock {
    /// Clock starting at the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at the given milliseconds since the epoch.
    #[must_use]
    pub fn at_ms(start_ms: i64) -> Self {
        assert!(start_ms >= 0, "start_ms must be non-negative, got {start_ms}");
        Self {
            current_ms: AtomicI64::new(start_ms),
        }
    }

    /// Current time in milliseconds since the epoch.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Advance time and return the new value.
    ///
    /// # Panics
    /// Panics if `ms` is negative.
    pub fn advance_ms(&self, ms: i64) -> i64 {
        assert!(ms >= 0, "advance_ms({ms}) must not go backwards");
        self.current_ms.fetch_add(ms, Ordering::SeqCst) + ms
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_ms())
            .single()
            .unwrap_or_else(Utc::now)
    }
}
