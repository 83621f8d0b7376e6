//! Pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sentinel stored in `min_use_nanos` while no use has been recorded.
const NO_USE_RECORDED: u64 = u64::MAX;

/// Statistics tracked by the pool.
///
/// All fields are atomic so they can be updated outside the pool lock and
/// read at any time without it.
///
/// # Memory Ordering
/// `Ordering::Relaxed` throughout: counters are independent and only need
/// atomicity, not ordering against each other.
///
/// # Example
/// ```
/// use synchronized_pool::PoolStats;
/// use std::time::Duration;
///
/// let stats = PoolStats::new();
/// stats.record_use(Duration::from_millis(3));
/// assert_eq!(stats.max_use_time(), Duration::from_millis(3));
/// assert_eq!(stats.min_use_time(), Some(Duration::from_millis(3)));
/// ```
#[derive(Debug)]
pub struct PoolStats {
    /// Objects built by the lifecycle's `create`.
    pub created: AtomicU64,

    /// Objects handed to the lifecycle's `destroy`.
    pub destroyed: AtomicU64,

    /// Successful `acquire` calls.
    pub acquired: AtomicU64,

    /// Successful `release` calls.
    pub released: AtomicU64,

    /// Failed activations and validations.
    pub broken: AtomicU64,

    /// `acquire` calls that gave up after `max_wait`.
    pub timeouts: AtomicU64,

    /// `acquire` calls refused under the fail-fast policy.
    pub exhausted: AtomicU64,

    /// Active objects dropped from bookkeeping as leaked.
    pub leaked: AtomicU64,

    /// `acquire` calls made by a thread already holding an object from the
    /// pool. Only counted with `test_threads`.
    pub repeat_checkouts: AtomicU64,

    /// Longest observed time between acquire and release, in nanoseconds.
    max_use_nanos: AtomicU64,

    /// Shortest observed time between acquire and release, in nanoseconds.
    min_use_nanos: AtomicU64,
}

impl PoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            broken: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
            leaked: AtomicU64::new(0),
            repeat_checkouts: AtomicU64::new(0),
            max_use_nanos: AtomicU64::new(0),
            min_use_nanos: AtomicU64::new(NO_USE_RECORDED),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    // ========================================================================
    // Use-time extrema
    // ========================================================================

    /// Fold one acquire-to-release duration into the extrema.
    pub fn record_use(&self, used: Duration) {
        let nanos = u64::try_from(used.as_nanos()).unwrap_or(u64::MAX - 1);
        self.max_use_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.min_use_nanos.fetch_min(nanos, Ordering::Relaxed);
    }

    /// Longest recorded use, or zero if none.
    pub fn max_use_time(&self) -> Duration {
        Duration::from_nanos(self.max_use_nanos.load(Ordering::Relaxed))
    }

    /// Shortest recorded use, or `None` if none.
    pub fn min_use_time(&self) -> Option<Duration> {
        match self.min_use_nanos.load(Ordering::Relaxed) {
            NO_USE_RECORDED => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }

    /// Forget the recorded maximum.
    pub fn reset_max_use_time(&self) {
        self.max_use_nanos.store(0, Ordering::Relaxed);
    }

    /// Forget the recorded minimum.
    pub fn reset_min_use_time(&self) {
        self.min_use_nanos.store(NO_USE_RECORDED, Ordering::Relaxed);
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Get a snapshot of current statistics.
    ///
    /// This returns a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            broken: self.broken.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            leaked: self.leaked.load(Ordering::Relaxed),
            repeat_checkouts: self.repeat_checkouts.load(Ordering::Relaxed),
            max_use_time: self.max_use_time(),
            min_use_time: self.min_use_time(),
        }
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of pool statistics.
///
/// Unlike `PoolStats`, this is not atomic and can be safely
/// printed, compared, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub created: u64,
    pub destroyed: u64,
    pub acquired: u64,
    pub released: u64,
    pub broken: u64,
    pub timeouts: u64,
    pub exhausted: u64,
    pub leaked: u64,
    pub repeat_checkouts: u64,
    pub max_use_time: Duration,
    pub min_use_time: Option<Duration>,
}

impl StatsSnapshot {
    /// Objects created and not yet destroyed.
    ///
    /// Leaked objects stay in this count: the pool forgot them, but nobody
    /// destroyed them.
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.destroyed)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ created: {}, destroyed: {}, acquired: {}, released: {}, broken: {}, timeouts: {}, max_use: {:?} }}",
            self.created,
            self.destroyed,
            self.acquired,
            self.released,
            self.broken,
            self.timeouts,
            self.max_use_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = PoolStats::new();
        assert_eq!(stats.created.load(Ordering::Relaxed), 0);
        assert_eq!(stats.max_use_time(), Duration::ZERO);
        assert_eq!(stats.min_use_time(), None);
    }

    #[test]
    fn test_use_time_extrema() {
        let stats = PoolStats::new();
        stats.record_use(Duration::from_millis(20));
        stats.record_use(Duration::from_millis(5));
        stats.record_use(Duration::from_millis(12));

        assert_eq!(stats.max_use_time(), Duration::from_millis(20));
        assert_eq!(stats.min_use_time(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_reset_use_times_independently() {
        let stats = PoolStats::new();
        stats.record_use(Duration::from_millis(20));
        stats.record_use(Duration::from_millis(5));

        stats.reset_max_use_time();
        assert_eq!(stats.max_use_time(), Duration::ZERO);
        assert_eq!(stats.min_use_time(), Some(Duration::from_millis(5)));

        stats.reset_min_use_time();
        assert_eq!(stats.min_use_time(), None);

        stats.record_use(Duration::from_millis(7));
        assert_eq!(stats.max_use_time(), Duration::from_millis(7));
        assert_eq!(stats.min_use_time(), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = PoolStats::new();
        PoolStats::bump(&stats.created);
        PoolStats::bump(&stats.created);
        PoolStats::bump(&stats.destroyed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.created, 2);
        assert_eq!(snapshot.destroyed, 1);
        assert_eq!(snapshot.live(), 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = PoolStats::new();
        stats.acquired.fetch_add(80, Ordering::Relaxed);
        stats.released.fetch_add(79, Ordering::Relaxed);
        stats.timeouts.fetch_add(2, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());

        assert!(display.contains("acquired: 80"));
        assert!(display.contains("released: 79"));
        assert!(display.contains("timeouts: 2"));
    }
}
