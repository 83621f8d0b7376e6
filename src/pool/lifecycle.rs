//! The lifecycle contract a resource type implements to be poolable.
//!
//! Hooks run outside the pool lock, except for the reaper's idle test. Every
//! call goes through the helpers at the bottom of this module, which turn a
//! panicking hook into an ordinary failure.

use std::panic::{self, AssertUnwindSafe};

use crate::common::{BoxError, EntryId};
use crate::pool::PoolEntry;

/// Capabilities supplied by the owner of the pooled resource type.
///
/// Only `create` is required. The remaining hooks default to "always fine"
/// and a plain drop.
///
/// # Example
/// ```
/// use synchronized_pool::{Lifecycle, PoolEntry};
///
/// struct Buffers;
///
/// impl Lifecycle for Buffers {
///     type Resource = Vec<u8>;
///     type Error = std::convert::Infallible;
///
///     fn create(&self) -> Result<Vec<u8>, Self::Error> {
///         Ok(Vec::with_capacity(4096))
///     }
///
///     fn deactivate(&self, entry: &mut PoolEntry<Vec<u8>>) -> bool {
///         entry.resource_mut().clear();
///         true
///     }
/// }
/// ```
pub trait Lifecycle: Send + Sync + 'static {
    /// The pooled resource.
    type Resource: Send + 'static;

    /// Error raised by `create`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a new resource. A failure aborts the acquisition that needed it.
    fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Prepare an entry for hand-out. `false` means unusable.
    fn activate(&self, _entry: &mut PoolEntry<Self::Resource>) -> bool {
        true
    }

    /// Health check, run at the points selected by the `test_on_*` flags.
    fn validate(&self, _entry: &mut PoolEntry<Self::Resource>) -> bool {
        true
    }

    /// Prepare an entry for the idle set. `false` means discard.
    fn deactivate(&self, _entry: &mut PoolEntry<Self::Resource>) -> bool {
        true
    }

    /// Release the underlying OS or network resource. Called exactly once
    /// per entry.
    fn destroy(&self, resource: Self::Resource) {
        drop(resource);
    }
}

// ============================================================================
// Panic-isolated hook calls
// ============================================================================

/// Which hook is being run, for log output.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Hook {
    Activate,
    Validate,
    Deactivate,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::Activate => "activate",
            Hook::Validate => "validate",
            Hook::Deactivate => "deactivate",
        }
    }
}

/// Run a boolean hook; a panic counts as `false`.
pub(crate) fn run_hook<L: Lifecycle>(
    lifecycle: &L,
    hook: Hook,
    entry: &mut PoolEntry<L::Resource>,
) -> bool {
    let id = entry.id();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match hook {
        Hook::Activate => lifecycle.activate(entry),
        Hook::Validate => lifecycle.validate(entry),
        Hook::Deactivate => lifecycle.deactivate(entry),
    }));

    match outcome {
        Ok(ok) => ok,
        Err(_) => {
            tracing::warn!(entry = %id, hook = hook.name(), "lifecycle hook panicked");
            false
        }
    }
}

/// Run `create`; a panic becomes an error.
pub(crate) fn create_resource<L: Lifecycle>(lifecycle: &L) -> Result<L::Resource, BoxError> {
    match panic::catch_unwind(AssertUnwindSafe(|| lifecycle.create())) {
        Ok(Ok(resource)) => Ok(resource),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err("create panicked".into()),
    }
}

/// Run `destroy`; a panic is logged and swallowed.
pub(crate) fn destroy_resource<L: Lifecycle>(lifecycle: &L, id: EntryId, resource: L::Resource) {
    if panic::catch_unwind(AssertUnwindSafe(|| lifecycle.destroy(resource))).is_err() {
        tracing::warn!(entry = %id, "lifecycle destroy panicked");
    }
}
