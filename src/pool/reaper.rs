//! Background reaper.
//!
//! One cycle (`reap`) does three things, in order:
//! 1. Destroys idle entries past `max_idle_time`, and with `test_on_idle`
//!    those failing an activate/validate/deactivate round. If `Grow` has
//!    pushed the pool past `max_active`, the oldest idle entries go too.
//! 2. Creates objects until `min_idle` are idle, within `max_active`.
//! 3. With `test_threads`, drops active entries held longer than
//!    `max_idle_time` from bookkeeping and logs where they were acquired.
//!
//! The [`Reaper`] runs cycles on a dedicated thread at a fixed interval.
//! A cycle that panics is logged; the thread keeps going.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::common::EntryId;
use crate::pool::lifecycle::{self, Hook, Lifecycle};
use crate::pool::synchronized_pool::Shared;
use crate::pool::{PoolEntry, PoolStats};

/// What one reaper cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Idle entries destroyed for exceeding `max_idle_time`.
    pub evicted: usize,
    /// Idle entries destroyed for failing the idle test.
    pub failed_idle_test: usize,
    /// Idle entries destroyed to bring a grown pool back to `max_active`.
    pub trimmed: usize,
    /// Entries created to reach `min_idle`.
    pub created: usize,
    /// Active entries dropped from bookkeeping as leaked.
    pub leaked: usize,
}

impl<L: Lifecycle> Shared<L> {
    pub(crate) fn reap(&self) -> ReapReport {
        let mut report = ReapReport::default();

        let stale = self.prune_idle(&mut report);
        for entry in stale {
            self.destroy(entry);
        }

        report.created = self.replenish();

        if self.config.test_threads {
            if let Some(max_age) = self.config.max_idle_time {
                report.leaked = self.drop_leaked(max_age);
            }
        }

        tracing::debug!(
            evicted = report.evicted,
            failed_idle_test = report.failed_idle_test,
            trimmed = report.trimmed,
            created = report.created,
            leaked = report.leaked,
            "reaper cycle finished"
        );
        report
    }

    /// Take stale entries out of the idle set, keeping the others in order.
    fn prune_idle(&self, report: &mut ReapReport) -> Vec<PoolEntry<L::Resource>> {
        let mut state = self.state.lock();
        if !state.running {
            return Vec::new();
        }

        let mut stale = Vec::new();
        let mut kept = VecDeque::with_capacity(state.idle.len());
        while let Some(mut entry) = state.idle.pop_front() {
            let expired = self
                .config
                .max_idle_time
                .is_some_and(|max| entry.idle_time() > max);

            if expired {
                report.evicted += 1;
                stale.push(entry);
            } else if self.config.test_on_idle && !self.idle_test(&mut entry) {
                report.failed_idle_test += 1;
                stale.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        state.idle = kept;

        if self.config.is_capped() {
            while state.size() > self.config.max_active {
                let Some(entry) = state.idle.pop_front() else {
                    break;
                };
                report.trimmed += 1;
                stale.push(entry);
            }
        }
        stale
    }

    /// A full use cycle without handing the object to anyone.
    fn idle_test(&self, entry: &mut PoolEntry<L::Resource>) -> bool {
        let ok = lifecycle::run_hook(&self.lifecycle, Hook::Activate, entry)
            && lifecycle::run_hook(&self.lifecycle, Hook::Validate, entry)
            && lifecycle::run_hook(&self.lifecycle, Hook::Deactivate, entry);
        if !ok {
            PoolStats::bump(&self.stats.broken);
            entry.mark_broken();
        }
        ok
    }

    /// Create objects up to `min_idle`. Returns how many went idle.
    fn replenish(&self) -> usize {
        let wanted = {
            let mut state = self.state.lock();
            if !state.running {
                return 0;
            }
            let deficit = self.config.min_idle.saturating_sub(state.idle.len());
            let room = if self.config.is_capped() {
                self.config.max_active.saturating_sub(state.size())
            } else {
                deficit
            };
            let wanted = deficit.min(room);
            state.reserved += wanted;
            wanted
        };

        if wanted == 0 {
            return 0;
        }

        let mut fresh = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            match lifecycle::create_resource(&self.lifecycle) {
                Ok(resource) => {
                    PoolStats::bump(&self.stats.created);
                    fresh.push(PoolEntry::new(EntryId::next(), resource));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "reaper could not create idle object");
                    break;
                }
            }
        }

        let mut rejected = Vec::new();
        let added = {
            let mut state = self.state.lock();
            state.reserved -= wanted;
            let mut added = 0;
            for entry in fresh {
                let idle_full =
                    self.config.max_idle > 0 && state.idle.len() >= self.config.max_idle;
                if state.running && !idle_full {
                    state.idle.push_back(entry);
                    added += 1;
                } else {
                    rejected.push(entry);
                }
            }
            added
        };

        // Reserved slots are free again even if nothing was added.
        self.available.notify_all();
        for entry in rejected {
            self.destroy(entry);
        }
        added
    }

    /// Forget active entries checked out longer than `max_age`.
    fn drop_leaked(&self, max_age: Duration) -> usize {
        let leaked = {
            let mut state = self.state.lock();
            let leaked = match state.tracker.as_mut() {
                Some(tracker) => tracker.take_older_than(max_age),
                None => return 0,
            };
            for (id, _) in &leaked {
                state.active.remove(id);
            }
            leaked
        };

        if leaked.is_empty() {
            return 0;
        }
        self.available.notify_all();

        for (id, checkout) in &leaked {
            PoolStats::bump(&self.stats.leaked);
            tracing::warn!(
                entry = %id,
                thread = checkout.thread_name.as_deref().unwrap_or("<unnamed>"),
                held_for = ?checkout.at.elapsed(),
                "pooled object held longer than the idle limit; removing it from the pool\n\
                 acquired at:\n{}",
                checkout.trace,
            );
        }
        leaked.len()
    }
}

// ============================================================================
// Reaper thread
// ============================================================================

/// Stop flag the reaper sleeps on.
struct Signal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Signal {
    /// Sleep for `interval` or until stopped. Returns whether stopped.
    fn sleep(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Handle to the reaper thread.
pub(crate) struct Reaper {
    signal: Arc<Signal>,
    handle: JoinHandle<()>,
}

impl Reaper {
    pub(crate) fn spawn<L: Lifecycle>(
        shared: Arc<Shared<L>>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let signal = Arc::new(Signal {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });

        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("pool-reaper".into())
            .spawn(move || run(&shared, &thread_signal, interval))?;

        Ok(Self { signal, handle })
    }

    /// Stop the thread and wait for a running cycle to finish.
    pub(crate) fn stop(self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();
        if self.handle.join().is_err() {
            tracing::warn!("reaper thread panicked");
        }
    }
}

fn run<L: Lifecycle>(shared: &Shared<L>, signal: &Signal, interval: Duration) {
    while !signal.sleep(interval) {
        if panic::catch_unwind(AssertUnwindSafe(|| shared.reap())).is_err() {
            tracing::warn!("reaper cycle panicked");
        }
    }
    tracing::debug!("reaper stopped");
}
