//! Common types shared across the pool.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (`PoolConfig`, `ExhaustedAction`, defaults)
//! - Error types
//! - Identifiers (EntryId)

pub mod config;
pub mod error;
mod entry_id;

pub use config::{ExhaustedAction, PoolConfig};
pub use entry_id::EntryId;
pub use error::{BoxError, Error, Result};
