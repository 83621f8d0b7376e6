//! Handles to objects checked out of a pool.
//!
//! - [`Pooled`] - an owned handle, returned explicitly with `release`
//! - [`PoolGuard`] - an RAII guard that releases on drop
//!
//! Both deref to the pooled resource.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::common::{EntryId, Result};
use crate::pool::{Lifecycle, PoolEntry, SynchronizedPool};

/// An object checked out of a pool.
///
/// Hand it back with [`SynchronizedPool::release`]. Dropping it instead
/// drops the resource without running `destroy`, and the pool keeps counting
/// it as active.
///
/// # Example
/// ```ignore
/// let mut conn = pool.acquire()?;
/// conn.execute("SELECT 1")?;   // DerefMut to the resource
/// pool.release(conn)?;
/// ```
pub struct Pooled<T> {
    entry: PoolEntry<T>,
}

impl<T> Pooled<T> {
    pub(crate) fn new(entry: PoolEntry<T>) -> Self {
        Self { entry }
    }

    pub(crate) fn into_entry(self) -> PoolEntry<T> {
        self.entry
    }

    /// Id of the underlying entry.
    #[inline]
    pub fn id(&self) -> EntryId {
        self.entry.id()
    }

    /// The entry's metadata.
    #[inline]
    pub fn entry(&self) -> &PoolEntry<T> {
        &self.entry
    }

    /// Ask the pool to destroy this object on release instead of keeping it.
    #[inline]
    pub fn mark_broken(&mut self) {
        self.entry.mark_broken();
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.entry.resource()
    }
}

impl<T> DerefMut for Pooled<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.entry.resource_mut()
    }
}

impl<T> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled").field("entry", &self.entry).finish()
    }
}

/// Guard returning its object to the pool when dropped.
///
/// A release failure on drop is logged. Call [`release`](Self::release) to
/// observe it instead.
///
/// # Example
/// ```ignore
/// {
///     let buf = pool.acquire_guard()?;
///     buf.len();   // Deref to the resource
///     // guard drops here, object released
/// }
/// ```
pub struct PoolGuard<'a, L: Lifecycle> {
    /// Reference back to the pool for release on drop.
    pool: &'a SynchronizedPool<L>,
    /// `None` only after the object has been released.
    pooled: Option<Pooled<L::Resource>>,
}

impl<'a, L: Lifecycle> PoolGuard<'a, L> {
    /// Called by `SynchronizedPool::acquire_guard()`.
    pub(crate) fn new(pool: &'a SynchronizedPool<L>, pooled: Pooled<L::Resource>) -> Self {
        Self {
            pool,
            pooled: Some(pooled),
        }
    }

    fn pooled(&self) -> &Pooled<L::Resource> {
        match &self.pooled {
            Some(pooled) => pooled,
            None => unreachable!("pool guard used after release"),
        }
    }

    fn pooled_mut(&mut self) -> &mut Pooled<L::Resource> {
        match &mut self.pooled {
            Some(pooled) => pooled,
            None => unreachable!("pool guard used after release"),
        }
    }

    /// Id of the underlying entry.
    #[inline]
    pub fn id(&self) -> EntryId {
        self.pooled().id()
    }

    /// The entry's metadata.
    #[inline]
    pub fn entry(&self) -> &PoolEntry<L::Resource> {
        self.pooled().entry()
    }

    /// Ask the pool to destroy this object on release instead of keeping it.
    #[inline]
    pub fn mark_broken(&mut self) {
        self.pooled_mut().mark_broken();
    }

    /// Release now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        match self.pooled.take() {
            Some(pooled) => self.pool.release(pooled),
            None => Ok(()),
        }
    }
}

impl<L: Lifecycle> Deref for PoolGuard<'_, L> {
    type Target = L::Resource;

    #[inline]
    fn deref(&self) -> &L::Resource {
        &**self.pooled()
    }
}

impl<L: Lifecycle> DerefMut for PoolGuard<'_, L> {
    #[inline]
    fn deref_mut(&mut self) -> &mut L::Resource {
        &mut **self.pooled_mut()
    }
}

impl<L: Lifecycle> Drop for PoolGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            if let Err(err) = self.pool.release(pooled) {
                tracing::warn!(error = %err, "failed to return pooled object on drop");
            }
        }
    }
}

impl<L: Lifecycle> fmt::Debug for PoolGuard<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolGuard")
            .field("pooled", &self.pooled)
            .finish()
    }
}
