//! Environment abstraction for deterministic testing.
//!
//! Decouples the connection manager's timing logic (idle reaper, read
//! timeouts) from real system clocks, so tests can drive time explicitly
//! instead of sleeping in wall-clock time.

use std::time::Duration;

/// Abstract environment providing monotonic time and async sleep.
///
/// # Safety
///
/// Implementations MUST guarantee `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; test environments
    /// may use a synthetic, explicitly-advanced clock.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// Subsequent calls must return times that never decrease within a
    /// single execution context.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the only async method in the trait. It is used exclusively
    /// by the connection manager's idle-reaper loop, never by the pure
    /// `Connection` state machine.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
