//! SynchronizedPool - the bounded, thread-shared object pool.
//!
//! The [`SynchronizedPool`] provides:
//! - Reuse of expensive objects through an idle set
//! - A cap on objects in circulation with a selectable exhaustion policy
//! - Lifecycle hooks around hand-out and return
//! - A background reaper (see `reaper.rs`) for idle eviction and refill

use std::backtrace::Backtrace;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::common::{EntryId, Error, ExhaustedAction, PoolConfig, Result};
use crate::pool::lifecycle::{self, Hook, Lifecycle};
use crate::pool::reaper::Reaper;
use crate::pool::tracker::{Checkout, ThreadTracker};
use crate::pool::{PoolEntry, PoolGuard, PoolStats, Pooled, ReapReport};

/// A bounded pool of objects shared between threads.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                      SynchronizedPool                        │
/// │  ┌────────────────────── Mutex ───────────────────────────┐  │
/// │  │  idle: VecDeque<PoolEntry>   active: EntryId → Instant │  │
/// │  │  reserved   waiting   running   tracker (optional)     │  │
/// │  └────────────────────────────────────────────────────────┘  │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │
/// │  │  available   │  │  lifecycle   │  │      stats       │    │
/// │  │   Condvar    │  │  (no lock)   │  │ (atomic, no lock)│    │
/// │  └──────────────┘  └──────────────┘  └──────────────────┘    │
/// │  ┌────────────────────────────────────────────────────────┐  │
/// │  │          reaper thread (periodic `reap`)               │  │
/// │  └────────────────────────────────────────────────────────┘  │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// All bookkeeping sits behind one `Mutex` with one `Condvar` for blocked
/// acquirers. Lifecycle hooks (`create`, `activate`, `validate`,
/// `deactivate`, `destroy`) run outside the lock, except for the reaper's
/// idle test which runs on entries still resident in the idle set.
///
/// # Invariants
/// - An entry is either idle (owned by the pool) or active (owned by the
///   caller's [`Pooled`] handle, id kept in the active set), never both.
/// - Under `Fail` and `Block`, idle + active + reserved never exceeds
///   `max_active` when it is non-zero.
///
/// # Usage
/// ```
/// use synchronized_pool::{Lifecycle, PoolConfig, SynchronizedPool};
///
/// struct Numbers;
///
/// impl Lifecycle for Numbers {
///     type Resource = u64;
///     type Error = std::convert::Infallible;
///
///     fn create(&self) -> Result<u64, Self::Error> {
///         Ok(42)
///     }
/// }
///
/// let pool = SynchronizedPool::new(Numbers, PoolConfig::default()).unwrap();
///
/// let number = pool.acquire().unwrap();
/// assert_eq!(*number, 42);
/// pool.release(number).unwrap();
///
/// {
///     let guard = pool.acquire_guard().unwrap();
///     assert_eq!(*guard, 42);
///     // guard drops: object returned to the pool
/// }
/// assert_eq!(pool.num_idle(), 1);
/// ```
pub struct SynchronizedPool<L: Lifecycle> {
    shared: Arc<Shared<L>>,

    /// Background reaper, if one was configured and is still running.
    reaper: Mutex<Option<Reaper>>,
}

/// State shared between callers and the reaper thread.
pub(crate) struct Shared<L: Lifecycle> {
    pub(crate) lifecycle: L,
    pub(crate) config: PoolConfig,
    pub(crate) state: Mutex<PoolState<L::Resource>>,

    /// Signalled whenever an object or a slot becomes available, and on
    /// shutdown.
    pub(crate) available: Condvar,

    pub(crate) stats: PoolStats,
}

/// Everything guarded by the pool lock.
pub(crate) struct PoolState<T> {
    /// Idle entries; the back is the most recently returned.
    pub(crate) idle: VecDeque<PoolEntry<T>>,

    /// Ids of entries handed out (or being created for hand-out), with the
    /// instant they left the pool.
    pub(crate) active: HashMap<EntryId, Instant>,

    /// Slots claimed by the reaper for objects it is creating.
    pub(crate) reserved: usize,

    /// Callers blocked in `acquire`.
    pub(crate) waiting: usize,

    pub(crate) running: bool,

    /// Thread-affinity observer, present when `test_threads` is set.
    pub(crate) tracker: Option<ThreadTracker>,
}

impl<T> PoolState<T> {
    fn new(track_threads: bool) -> Self {
        Self {
            idle: VecDeque::new(),
            active: HashMap::new(),
            reserved: 0,
            waiting: 0,
            running: true,
            tracker: track_threads.then(ThreadTracker::new),
        }
    }

    /// Objects counted against `max_active`.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.idle.len() + self.active.len() + self.reserved
    }
}

/// What one pass over the pool state produced for an acquirer.
enum Candidate<T> {
    /// An entry taken from the idle set.
    Idle(PoolEntry<T>),
    /// A slot in the active set for an object still to be created.
    Reserved(EntryId),
}

impl<L: Lifecycle> SynchronizedPool<L> {
    /// Create a pool and, if `config.reaper_interval` is set, start its
    /// reaper thread.
    ///
    /// No objects are created up front; the first reaper cycle fills the
    /// pool up to `min_idle`.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if the configuration is inconsistent
    /// - `Error::Io` if the reaper thread cannot be spawned
    pub fn new(lifecycle: L, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::new(config.test_threads)),
            available: Condvar::new(),
            stats: PoolStats::new(),
            lifecycle,
            config,
        });

        let reaper = match shared.config.reaper_interval {
            Some(interval) => Some(Reaper::spawn(Arc::clone(&shared), interval)?),
            None => None,
        };

        Ok(Self {
            shared,
            reaper: Mutex::new(reaper),
        })
    }

    // ========================================================================
    // Public API: Acquire and release
    // ========================================================================

    /// Take an object out of the pool, creating one if needed.
    ///
    /// # Errors
    /// - `Error::Stopped` if the pool has been shut down
    /// - `Error::Exhausted` under `ExhaustedAction::Fail` at the cap
    /// - `Error::Timeout` under `ExhaustedAction::Block` once `max_wait` passes
    /// - `Error::CreationFailed` if the lifecycle could not create an object
    /// - `Error::ActivationFailed` if a freshly created object failed activation
    pub fn acquire(&self) -> Result<Pooled<L::Resource>> {
        self.shared.acquire()
    }

    /// Like [`acquire`](Self::acquire), but the object goes back to the pool
    /// when the returned guard is dropped.
    pub fn acquire_guard(&self) -> Result<PoolGuard<'_, L>> {
        let pooled = self.acquire()?;
        Ok(PoolGuard::new(self, pooled))
    }

    /// Return an object to the pool.
    ///
    /// Depending on configuration and hook results the object is kept idle
    /// or destroyed. Objects returned after shutdown are destroyed.
    ///
    /// # Errors
    /// - `Error::NotMember` if the handle is not active in this pool (it came
    ///   from another pool, or the reaper dropped it as leaked). The object is
    ///   destroyed.
    pub fn release(&self, pooled: Pooled<L::Resource>) -> Result<()> {
        self.shared.release(pooled)
    }

    /// Stop the pool.
    ///
    /// Stops the reaper, wakes blocked acquirers (they fail with
    /// `Error::Stopped`) and destroys all idle objects. Active objects stay
    /// with their holders and are destroyed when released. Calling this again
    /// has no effect.
    pub fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.stop();
        }
        self.shared.stop();
    }

    /// Run one reaper cycle on the calling thread.
    pub fn reap(&self) -> ReapReport {
        self.shared.reap()
    }

    // ========================================================================
    // Public API: Diagnostics
    // ========================================================================

    /// Objects currently idle.
    pub fn num_idle(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Objects currently handed out.
    pub fn num_active(&self) -> usize {
        self.shared.state.lock().active.len()
    }

    /// Idle plus active objects.
    pub fn pool_size(&self) -> usize {
        let state = self.shared.state.lock();
        state.idle.len() + state.active.len()
    }

    /// Callers currently blocked in `acquire`.
    pub fn num_waiting(&self) -> usize {
        self.shared.state.lock().waiting
    }

    /// Failed activations and validations so far.
    pub fn num_broken(&self) -> u64 {
        self.shared
            .stats
            .broken
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Longest time an object was held between acquire and release.
    pub fn max_use_time(&self) -> Duration {
        self.shared.stats.max_use_time()
    }

    /// Shortest time an object was held, or `None` before the first release.
    pub fn min_use_time(&self) -> Option<Duration> {
        self.shared.stats.min_use_time()
    }

    /// Forget the recorded maximum use time.
    pub fn reset_max_use_time(&self) {
        self.shared.stats.reset_max_use_time();
    }

    /// Forget the recorded minimum use time.
    pub fn reset_min_use_time(&self) {
        self.shared.stats.reset_min_use_time();
    }

    /// Get pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.shared.stats
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// The lifecycle the pool was built with.
    pub fn lifecycle(&self) -> &L {
        &self.shared.lifecycle
    }

    /// Whether `shutdown` has not been called yet.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }
}

impl<L: Lifecycle> Drop for SynchronizedPool<L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<L: Lifecycle> fmt::Debug for SynchronizedPool<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SynchronizedPool")
            .field("idle", &state.idle.len())
            .field("active", &state.active.len())
            .field("waiting", &state.waiting)
            .field("running", &state.running)
            .finish()
    }
}

// ============================================================================
// Internal: Acquisition protocol
// ============================================================================

impl<L: Lifecycle> Shared<L> {
    pub(crate) fn acquire(&self) -> Result<Pooled<L::Resource>> {
        let started = Instant::now();

        loop {
            let (mut entry, freshly_created) = match self.next_candidate(started)? {
                Candidate::Idle(entry) => (entry, false),
                Candidate::Reserved(id) => (self.create_reserved(id)?, true),
            };

            if self.activate(&mut entry) {
                entry.record_checkout();
                let checkout = self.config.test_threads.then(Checkout::capture);
                {
                    let mut state = self.state.lock();
                    // Use time runs from hand-out, not from the reservation.
                    if let Some(since) = state.active.get_mut(&entry.id()) {
                        *since = Instant::now();
                    }
                    if let (Some(tracker), Some(checkout)) = (state.tracker.as_mut(), checkout) {
                        tracker.record(entry.id(), checkout);
                    }
                }
                PoolStats::bump(&self.stats.acquired);
                return Ok(Pooled::new(entry));
            }

            // Activation failed: give the slot back and drop the entry.
            entry.mark_broken();
            self.state.lock().active.remove(&entry.id());
            self.available.notify_one();
            self.destroy(entry);

            if freshly_created {
                return Err(Error::ActivationFailed);
            }
        }
    }

    /// Pick an idle entry or reserve a slot for a new one, waiting or failing
    /// according to the exhaustion policy.
    fn next_candidate(&self, started: Instant) -> Result<Candidate<L::Resource>> {
        let current = self.config.test_threads.then(Backtrace::force_capture);
        let mut state = self.state.lock();

        if let (Some(tracker), Some(current)) = (state.tracker.as_ref(), current.as_ref()) {
            if tracker.warn_if_holding(current) > 0 {
                PoolStats::bump(&self.stats.repeat_checkouts);
            }
        }

        loop {
            if !state.running {
                return Err(Error::Stopped);
            }

            if let Some(entry) = state.idle.pop_back() {
                state.active.insert(entry.id(), Instant::now());
                return Ok(Candidate::Idle(entry));
            }

            let at_cap = self.config.is_capped() && state.size() >= self.config.max_active;
            if at_cap {
                match self.config.exhausted_action {
                    ExhaustedAction::Fail => {
                        PoolStats::bump(&self.stats.exhausted);
                        return Err(Error::Exhausted {
                            active: state.active.len(),
                            max_active: self.config.max_active,
                        });
                    }
                    ExhaustedAction::Block { max_wait } => {
                        state.waiting += 1;
                        match max_wait.filter(|wait| !wait.is_zero()) {
                            Some(max_wait) => {
                                let waited = started.elapsed();
                                if waited >= max_wait {
                                    state.waiting -= 1;
                                    PoolStats::bump(&self.stats.timeouts);
                                    tracing::debug!(
                                        waited = ?waited,
                                        active = state.active.len(),
                                        idle = state.idle.len(),
                                        "acquire timed out"
                                    );
                                    return Err(Error::Timeout {
                                        waited,
                                        active: state.active.len(),
                                        idle: state.idle.len(),
                                    });
                                }
                                self.available.wait_for(&mut state, max_wait - waited);
                            }
                            None => self.available.wait(&mut state),
                        }
                        state.waiting -= 1;
                        continue;
                    }
                    // Over the cap on purpose.
                    ExhaustedAction::Grow => {}
                }
            }

            let id = EntryId::next();
            state.active.insert(id, Instant::now());
            return Ok(Candidate::Reserved(id));
        }
    }

    /// Create the object for a slot reserved in the active set.
    fn create_reserved(&self, id: EntryId) -> Result<PoolEntry<L::Resource>> {
        match lifecycle::create_resource(&self.lifecycle) {
            Ok(resource) => {
                PoolStats::bump(&self.stats.created);
                tracing::debug!(entry = %id, "created pooled object");
                Ok(PoolEntry::new(id, resource))
            }
            Err(source) => {
                self.state.lock().active.remove(&id);
                self.available.notify_all();
                Err(Error::creation(source))
            }
        }
    }

    /// `activate`, then `validate` if `test_on_activate` is set.
    fn activate(&self, entry: &mut PoolEntry<L::Resource>) -> bool {
        let ok = lifecycle::run_hook(&self.lifecycle, Hook::Activate, entry)
            && (!self.config.test_on_activate
                || lifecycle::run_hook(&self.lifecycle, Hook::Validate, entry));
        if !ok {
            PoolStats::bump(&self.stats.broken);
        }
        ok
    }
}

// ============================================================================
// Internal: Release protocol
// ============================================================================

impl<L: Lifecycle> Shared<L> {
    pub(crate) fn release(&self, pooled: Pooled<L::Resource>) -> Result<()> {
        let mut entry = pooled.into_entry();
        let id = entry.id();

        let running = {
            let state = self.state.lock();
            if !state.active.contains_key(&id) {
                drop(state);
                return self.reject_foreign(entry);
            }
            state.running
        };

        let poolable = running && !entry.is_broken() && self.passivate(&mut entry);
        entry.touch();

        let mut state = self.state.lock();
        let Some(checked_out) = state.active.remove(&id) else {
            // The reaper dropped it as leaked while we were deactivating.
            drop(state);
            return self.reject_foreign(entry);
        };
        if let Some(tracker) = state.tracker.as_mut() {
            tracker.forget(id);
        }

        let idle_full = self.config.max_idle > 0 && state.idle.len() >= self.config.max_idle;
        let discarded = if poolable && state.running && !idle_full {
            state.idle.push_back(entry);
            None
        } else {
            Some(entry)
        };
        drop(state);
        self.available.notify_one();

        self.stats.record_use(checked_out.elapsed());
        PoolStats::bump(&self.stats.released);

        if let Some(entry) = discarded {
            self.destroy(entry);
        }
        Ok(())
    }

    /// Validate (if `test_on_deactivate`), then `deactivate`.
    fn passivate(&self, entry: &mut PoolEntry<L::Resource>) -> bool {
        if self.config.test_on_deactivate
            && !lifecycle::run_hook(&self.lifecycle, Hook::Validate, entry)
        {
            PoolStats::bump(&self.stats.broken);
            entry.mark_broken();
            return false;
        }
        lifecycle::run_hook(&self.lifecycle, Hook::Deactivate, entry)
    }

    fn reject_foreign(&self, entry: PoolEntry<L::Resource>) -> Result<()> {
        tracing::warn!(entry = %entry.id(), "released object is not active in this pool");
        self.destroy(entry);
        Err(Error::NotMember)
    }

    // ========================================================================
    // Internal: Teardown
    // ========================================================================

    pub(crate) fn destroy(&self, entry: PoolEntry<L::Resource>) {
        let id = entry.id();
        lifecycle::destroy_resource(&self.lifecycle, id, entry.into_resource());
        PoolStats::bump(&self.stats.destroyed);
        tracing::debug!(entry = %id, "destroyed pooled object");
    }

    /// Mark the pool stopped and destroy the idle set. Returns `false` if it
    /// was already stopped.
    pub(crate) fn stop(&self) -> bool {
        let drained: Vec<PoolEntry<L::Resource>> = {
            let mut state = self.state.lock();
            if !state.running {
                return false;
            }
            state.running = false;
            state.idle.drain(..).collect()
        };
        self.available.notify_all();

        let destroyed = drained.len();
        for entry in drained {
            self.destroy(entry);
        }
        tracing::info!(destroyed, "pool stopped");
        true
    }
}
