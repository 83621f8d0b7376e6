//! Thread-affinity tracking for leak diagnostics.
//!
//! [`ThreadTracker`] is an observer attached to acquire and release when
//! `test_threads` is enabled. It remembers which thread checked out which
//! entry, together with a backtrace of the checkout. The pool's state
//! machine never reads it; it only feeds log output and the reaper's leak
//! scan.

use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::common::EntryId;

/// Who holds an entry and since when.
#[derive(Debug)]
pub(crate) struct Checkout {
    pub(crate) thread: ThreadId,
    pub(crate) thread_name: Option<String>,
    pub(crate) at: Instant,
    pub(crate) trace: Backtrace,
}

impl Checkout {
    /// Record the calling thread. Captures a backtrace, so call this
    /// outside the pool lock.
    pub(crate) fn capture() -> Self {
        let current = thread::current();
        Self {
            thread: current.id(),
            thread_name: current.name().map(str::to_owned),
            at: Instant::now(),
            trace: Backtrace::force_capture(),
        }
    }
}

/// Active checkouts keyed by entry.
#[derive(Debug, Default)]
pub(crate) struct ThreadTracker {
    checkouts: HashMap<EntryId, Checkout>,
}

impl ThreadTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Log a warning for every entry the calling thread already holds and
    /// return how many there were.
    ///
    /// Holding two objects from one pool on one thread is the classic
    /// set-up for a self-deadlock under a blocking policy. `current` is the
    /// caller's backtrace, captured before the pool lock was taken.
    pub(crate) fn warn_if_holding(&self, current: &Backtrace) -> usize {
        let me = thread::current().id();
        let mut warned = 0;
        for (id, checkout) in self.checkouts.iter().filter(|(_, c)| c.thread == me) {
            tracing::warn!(
                entry = %id,
                thread = checkout.thread_name.as_deref().unwrap_or("<unnamed>"),
                held_for = ?checkout.at.elapsed(),
                "thread requests another pooled object while still holding one\n\
                 earlier checkout:\n{}\ncurrent request:\n{}",
                checkout.trace,
                current,
            );
            warned += 1;
        }
        warned
    }

    pub(crate) fn record(&mut self, id: EntryId, checkout: Checkout) {
        self.checkouts.insert(id, checkout);
    }

    pub(crate) fn forget(&mut self, id: EntryId) -> Option<Checkout> {
        self.checkouts.remove(&id)
    }

    /// Remove and return every checkout older than `max_age`.
    pub(crate) fn take_older_than(&mut self, max_age: Duration) -> Vec<(EntryId, Checkout)> {
        let stale: Vec<EntryId> = self
            .checkouts
            .iter()
            .filter(|(_, checkout)| checkout.at.elapsed() > max_age)
            .map(|(&id, _)| id)
            .collect();

        stale
            .into_iter()
            .filter_map(|id| self.checkouts.remove(&id).map(|checkout| (id, checkout)))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.checkouts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_forget() {
        let mut tracker = ThreadTracker::new();
        tracker.record(EntryId::new(1), Checkout::capture());
        assert_eq!(tracker.len(), 1);

        let checkout = tracker.forget(EntryId::new(1)).unwrap();
        assert_eq!(checkout.thread, thread::current().id());
        assert_eq!(tracker.len(), 0);
        assert!(tracker.forget(EntryId::new(1)).is_none());
    }

    #[test]
    fn test_take_older_than() {
        let mut tracker = ThreadTracker::new();
        tracker.record(EntryId::new(1), Checkout::capture());
        thread::sleep(Duration::from_millis(60));
        tracker.record(EntryId::new(2), Checkout::capture());

        let stale = tracker.take_older_than(Duration::from_millis(30));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, EntryId::new(1));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_warn_if_holding_counts_own_checkouts() {
        let current = Backtrace::force_capture();
        let mut tracker = ThreadTracker::new();
        assert_eq!(tracker.warn_if_holding(&current), 0);

        tracker.record(EntryId::new(3), Checkout::capture());
        tracker.record(EntryId::new(4), Checkout::capture());
        assert_eq!(tracker.warn_if_holding(&current), 2);

        // Checkouts of other threads are not ours to report.
        let other = thread::spawn(Checkout::capture).join().unwrap();
        tracker.forget(EntryId::new(4));
        tracker.record(EntryId::new(5), other);
        assert_eq!(tracker.warn_if_holding(&current), 1);
    }

    #[test]
    fn test_capture_records_thread_name() {
        let checkout = thread::Builder::new()
            .name("tracked".into())
            .spawn(Checkout::capture)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(checkout.thread_name.as_deref(), Some("tracked"));
    }
}
