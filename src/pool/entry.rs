//! PoolEntry - one pooled object plus its bookkeeping.
//!
//! A [`PoolEntry`] wraps a resource together with the metadata the pool
//! needs to manage it:
//! - A process-unique id used to match releases against the active set
//! - Creation and last-touch timestamps for idle eviction
//! - A use counter
//! - A broken flag that forces destruction on release

use std::fmt;
use std::time::{Duration, Instant};

use crate::common::EntryId;

/// A pooled object and its metadata.
///
/// While idle, the entry is owned by the pool. While active, it travels
/// inside the caller's [`Pooled`](crate::Pooled) handle and the pool keeps
/// only its id in the active set.
pub struct PoolEntry<T> {
    id: EntryId,
    resource: T,
    created_at: Instant,
    last_touched: Instant,
    use_count: u64,
    broken: bool,
}

impl<T> PoolEntry<T> {
    /// Wrap a freshly created resource.
    pub(crate) fn new(id: EntryId, resource: T) -> Self {
        let now = Instant::now();
        Self {
            id,
            resource,
            created_at: now,
            last_touched: now,
            use_count: 0,
            broken: false,
        }
    }

    // ========================================================================
    // Resource access
    // ========================================================================

    /// The entry's id.
    #[inline]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Shared access to the resource.
    #[inline]
    pub fn resource(&self) -> &T {
        &self.resource
    }

    /// Exclusive access to the resource.
    #[inline]
    pub fn resource_mut(&mut self) -> &mut T {
        &mut self.resource
    }

    /// Unwrap the resource, discarding the metadata.
    #[inline]
    pub(crate) fn into_resource(self) -> T {
        self.resource
    }

    // ========================================================================
    // Timestamps
    // ========================================================================

    /// When the resource was created.
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the entry was last handed out or returned.
    #[inline]
    pub fn last_touched(&self) -> Instant {
        self.last_touched
    }

    /// Time since creation.
    #[inline]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the last hand-out or return.
    #[inline]
    pub fn idle_time(&self) -> Duration {
        self.last_touched.elapsed()
    }

    /// Reset the last-touch timestamp to now.
    #[inline]
    pub(crate) fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    // ========================================================================
    // Usage and health
    // ========================================================================

    /// How many times the entry has been handed out.
    #[inline]
    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    #[inline]
    pub(crate) fn record_checkout(&mut self) {
        self.use_count += 1;
        self.touch();
    }

    /// Whether the entry has been flagged as broken.
    #[inline]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Flag the entry as broken. A broken entry is destroyed on release
    /// instead of returning to the idle set.
    #[inline]
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl<T> fmt::Debug for PoolEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEntry")
            .field("id", &self.id)
            .field("age", &self.age())
            .field("idle_time", &self.idle_time())
            .field("use_count", &self.use_count)
            .field("broken", &self.broken)
            .finish()
    }
}
