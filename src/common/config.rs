//! Pool configuration.
//!
//! A [`PoolConfig`] is handed to the pool once at construction; there is no
//! hot reload. Defaults are exposed as constants so callers can reason about
//! them without constructing a config.

use std::time::Duration;

use crate::common::{Error, Result};

/// Default minimum number of idle objects kept by the reaper.
pub const DEFAULT_MIN_IDLE: usize = 0;

/// Default cap on idle objects (0 would mean unbounded).
pub const DEFAULT_MAX_IDLE: usize = 10;

/// Default cap on objects handed out at once (0 would mean unbounded).
pub const DEFAULT_MAX_ACTIVE: usize = 10;

/// Default idle time after which the reaper destroys an object.
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(60);

/// Default bound on a blocked `acquire`.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);

/// Default period of the background reaper.
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(10);

/// What `acquire` does when no object is idle and `max_active` is reached.
///
/// Evaluated once per acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedAction {
    /// Fail immediately with [`Error::Exhausted`].
    Fail,
    /// Wait for a release. `None` or a zero duration waits forever,
    /// otherwise the wait is bounded and ends with [`Error::Timeout`].
    Block { max_wait: Option<Duration> },
    /// Create a new object anyway, exceeding `max_active`.
    Grow,
}

impl Default for ExhaustedAction {
    fn default() -> Self {
        ExhaustedAction::Block {
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

/// Pool configuration.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use synchronized_pool::{ExhaustedAction, PoolConfig};
///
/// let config = PoolConfig {
///     max_active: 4,
///     exhausted_action: ExhaustedAction::Fail,
///     max_idle_time: Some(Duration::from_secs(30)),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle objects the reaper keeps available.
    pub min_idle: usize,
    /// Cap on idle objects; extra returns are destroyed. 0 = unbounded.
    pub max_idle: usize,
    /// Idle objects older than this are destroyed by the reaper. It is also
    /// the age after which an active object counts as leaked when
    /// `test_threads` is set. `None` disables both.
    pub max_idle_time: Option<Duration>,
    /// Cap on idle plus active objects. 0 = unbounded.
    pub max_active: usize,
    /// Behaviour when the cap is reached.
    pub exhausted_action: ExhaustedAction,
    /// Validate objects before handing them out.
    pub test_on_activate: bool,
    /// Validate objects when they are returned.
    pub test_on_deactivate: bool,
    /// Run a full activate/validate/deactivate cycle on idle objects in the
    /// reaper.
    pub test_on_idle: bool,
    /// Track which thread holds which object and report leaks.
    pub test_threads: bool,
    /// Period of the background reaper. `None` starts no thread.
    pub reaper_interval: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_idle: DEFAULT_MIN_IDLE,
            max_idle: DEFAULT_MAX_IDLE,
            max_idle_time: Some(DEFAULT_MAX_IDLE_TIME),
            max_active: DEFAULT_MAX_ACTIVE,
            exhausted_action: ExhaustedAction::default(),
            test_on_activate: false,
            test_on_deactivate: false,
            test_on_idle: false,
            test_threads: false,
            reaper_interval: Some(DEFAULT_REAPER_INTERVAL),
        }
    }
}

impl PoolConfig {
    /// Check the configuration for contradictions.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.max_idle > 0 && self.min_idle > self.max_idle {
            return Err(Error::InvalidConfig("min_idle must not exceed max_idle"));
        }
        if self.max_active > 0 && self.min_idle > self.max_active {
            return Err(Error::InvalidConfig("min_idle must not exceed max_active"));
        }
        if self.reaper_interval == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig("reaper_interval must be non-zero"));
        }
        Ok(())
    }

    /// Whether `max_active` bounds the pool.
    #[inline]
    pub(crate) fn is_capped(&self) -> bool {
        self.max_active > 0
    }
}
