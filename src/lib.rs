//! synchronized-pool - A bounded, thread-shared object pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SynchronizedPool                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Acquisition / Release protocols (pool/)           │   │
//! │  │   exhaustion policy: Fail | Block { max_wait } | Grow    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Pool core state (one Mutex + Condvar)          │   │
//! │  │        idle: VecDeque<PoolEntry>   active: id set        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │            ↑                                   ↓                │
//! │  ┌──────────────────────┐     ┌──────────────────────────────┐ │
//! │  │  Reaper thread       │     │  Lifecycle (caller-supplied) │ │
//! │  │  evict / refill /    │     │  create activate validate    │ │
//! │  │  leak report         │     │  deactivate destroy          │ │
//! │  └──────────────────────┘     └──────────────────────────────┘ │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │     Diagnostics: PoolStats, use-time extrema, tracker    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (EntryId, Error, config)
//! - [`pool`] - The pool, its lifecycle contract, handles and reaper
//!
//! # Quick Start
//! ```
//! use std::time::Duration;
//! use synchronized_pool::{ExhaustedAction, Lifecycle, PoolConfig, SynchronizedPool};
//!
//! struct Buffers;
//!
//! impl Lifecycle for Buffers {
//!     type Resource = Vec<u8>;
//!     type Error = std::convert::Infallible;
//!
//!     fn create(&self) -> Result<Vec<u8>, Self::Error> {
//!         Ok(Vec::with_capacity(4096))
//!     }
//! }
//!
//! let config = PoolConfig {
//!     max_active: 8,
//!     exhausted_action: ExhaustedAction::Block {
//!         max_wait: Some(Duration::from_millis(500)),
//!     },
//!     ..Default::default()
//! };
//! let pool = SynchronizedPool::new(Buffers, config).unwrap();
//!
//! let mut buf = pool.acquire_guard().unwrap();
//! buf.extend_from_slice(b"hello");
//! ```

pub mod common;
pub mod pool;

// Re-export commonly used items at crate root for convenience
pub use common::config::{
    DEFAULT_MAX_ACTIVE, DEFAULT_MAX_IDLE, DEFAULT_MAX_IDLE_TIME, DEFAULT_MAX_WAIT,
    DEFAULT_MIN_IDLE, DEFAULT_REAPER_INTERVAL,
};
pub use common::{BoxError, EntryId, Error, ExhaustedAction, PoolConfig, Result};

pub use pool::{
    Lifecycle, PoolEntry, PoolGuard, PoolStats, Pooled, ReapReport, StatsSnapshot,
    SynchronizedPool,
};
