//! Time source abstraction for the test case store.
//!
//! The store stamps `createdAt` from a `TimeSource` so that production uses the
//! system clock while tests can pin the clock to a known instant.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over the wall clock.
pub trait TimeSource: Send + Sync {
    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Real time source using the system clock.
///
/// This is the default implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        // A clock set before 1970 reports the epoch rather than failing the write.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| {
                i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
            })
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedTimeSource {
    current_time_ms: AtomicI64,
}

impl FixedTimeSource {
    /// Create a clock frozen at `initial_time_ms`.
    #[must_use]
    pub const fn new(initial_time_ms: i64) -> Self {
        Self {
            current_time_ms: AtomicI64::new(initial_time_ms),
        }
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.current_time_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_ms(&self) -> i64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}
