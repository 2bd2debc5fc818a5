//! Clock abstraction for testable timing behavior.
//!
//! TTL expiry, circuit reset windows, and sweeping all depend on the
//! current time. Production code uses [`RealClock`]; tests inject a
//! [`TestClock`] and advance it explicitly instead of sleeping.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for deterministic tests.
///
/// Time only moves when [`TestClock::advance`] or [`TestClock::set`] is
/// called, so TTL and circuit-window tests run without real sleeps.
/// Cloning shares the underlying time source.
#[derive(Debug, Clone)]
pub struct TestClock {
    // Milliseconds since the UNIX epoch.
    epoch_ms: Arc<AtomicI64>,
}

impl TestClock {
    /// Creates a test clock starting at the current system time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a test clock starting at a specific instant.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { epoch_ms: Arc::new(AtomicI64::new(start.timestamp_millis())) }
    }

    /// Moves the clock forward by the given duration.
    pub fn advance(&self, delta: Duration) {
        self.epoch_ms.fetch_add(delta.num_milliseconds(), Ordering::AcqRel);
    }

    /// Jumps the clock to an absolute instant. May move backwards.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.epoch_ms.store(instant.timestamp_millis(), Ordering::Release);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
    }
}
