//! Pool entry identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of entry identifiers, shared by every pool in the process.
///
/// Ids never repeat, so a handle from one pool can never collide with an
/// active entry of another.
static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies one pooled object for its whole life.
///
/// The pool's active set is keyed by `EntryId`; a handle passed back to
/// `release` is matched against it.
///
/// # Example
/// ```
/// use synchronized_pool::EntryId;
///
/// let id = EntryId::new(5);
/// assert_eq!(format!("{}", id), "Entry(5)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Create a new EntryId.
    #[inline]
    pub fn new(id: u64) -> Self {
        EntryId(id)
    }

    /// Allocate a process-unique id.
    #[inline]
    pub(crate) fn next() -> Self {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_new() {
        let id = EntryId::new(10);
        assert_eq!(id.0, 10);
    }

    #[test]
    fn test_entry_id_next_is_unique() {
        let a = EntryId::next();
        let b = EntryId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_entry_id_display() {
        assert_eq!(format!("{}", EntryId::new(42)), "Entry(42)");
    }
}
