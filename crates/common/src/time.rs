//! Time abstraction for testability
//!
//! Session lifecycle decisions compare "now" against persisted epoch
//! millisecond timestamps. Every component that needs the current time takes a
//! [`Clock`] so tests can pin and advance time without sleeping.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use authsession_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at_millis(1_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.millis_since_epoch(), 6_000);
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trait for wall-clock reads
pub trait Clock: Send + Sync {
    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    ///
    /// Times before the epoch clamp to zero.
    fn millis_since_epoch(&self) -> i64 {
        let millis =
            self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        i64::try_from(millis).unwrap_or(i64::MAX)
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Implement Clock for `Arc<T>` where `T: Clock` for convenient sharing
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }

    fn millis_since_epoch(&self) -> i64 {
        (**self).millis_since_epoch()
    }
}

/// Mock clock for deterministic testing
///
/// Holds an absolute epoch-millisecond reading that only moves when a test
/// calls [`MockClock::advance`] or [`MockClock::set_millis`]. Clones share the
/// same reading.
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<AtomicI64>,
}

impl MockClock {
    /// Create a mock clock frozen at the current real time
    #[must_use]
    pub fn new() -> Self {
        Self::at_millis(SystemClock.millis_since_epoch())
    }

    /// Create a mock clock frozen at an explicit epoch-millisecond reading
    #[must_use]
    pub fn at_millis(millis: i64) -> Self {
        Self { millis: Arc::new(AtomicI64::new(millis)) }
    }

    /// Simulate time passing without actually waiting
    pub fn advance(&self, duration: Duration) {
        let delta = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump to an absolute epoch-millisecond reading
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn system_time(&self) -> SystemTime {
        let millis = u64::try_from(self.millis.load(Ordering::SeqCst)).unwrap_or_default();
        UNIX_EPOCH + Duration::from_millis(millis)
    }

    fn millis_since_epoch(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for time.
    use super::*;

    /// Validates the system clock millis scenario.
    ///
    /// Assertions:
    /// - Ensures `millis > 0` evaluates to true.
    #[test]
    fn test_system_clock_millis() {
        let clock = SystemClock;
        let millis = clock.millis_since_epoch();
        assert!(millis > 0);
    }

    /// Validates `MockClock::at_millis` behavior for the advance scenario.
    ///
    /// Assertions:
    /// - Confirms `clock.millis_since_epoch()` equals `1_000 + 5_000`.
    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::at_millis(1_000);
        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.millis_since_epoch(), 6_000);
    }

    #[test]
    fn test_mock_clock_clones_share_reading() {
        let clock = MockClock::at_millis(0);
        let shared = clock.clone();

        shared.set_millis(42);

        assert_eq!(clock.millis_since_epoch(), 42);
        assert_eq!(clock.system_time(), UNIX_EPOCH + Duration::from_millis(42));
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock: Arc<dyn Clock> = Arc::new(MockClock::at_millis(7));
        assert_eq!(clock.millis_since_epoch(), 7);
    }
}
