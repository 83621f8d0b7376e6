//! Object pool.
//!
//! The pool keeps expensive objects (connections, sessions, buffers) for
//! reuse across threads, bounded by a configurable cap.
//!
//! # Components
//! - [`SynchronizedPool`] - The pool: acquisition, release, shutdown
//! - [`Lifecycle`] - Contract a pooled type implements
//! - [`PoolEntry`] - A pooled object plus metadata
//! - [`Pooled`] / [`PoolGuard`] - Handles to checked-out objects
//! - [`PoolStats`] - Counters and use-time extrema
//! - [`ReapReport`] - Outcome of one background maintenance cycle

mod entry;
mod guard;
mod lifecycle;
mod reaper;
mod stats;
mod synchronized_pool;
mod tracker;

pub use entry::PoolEntry;
pub use guard::{PoolGuard, Pooled};
pub use lifecycle::Lifecycle;
pub use reaper::ReapReport;
pub use stats::{PoolStats, StatsSnapshot};
pub use synchronized_pool::SynchronizedPool;
