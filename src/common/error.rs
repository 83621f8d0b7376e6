//! Error types for the pool.

use std::time::Duration;

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by a lifecycle's `create`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All possible errors raised by the pool.
///
/// Lifecycle hook failures (`activate`, `validate`, `deactivate` returning
/// `false`) are handled inside the pool and only surface here when retrying
/// cannot make progress.
#[derive(Debug, Error)]
pub enum Error {
    /// Fail-fast policy hit its cap with no idle objects.
    #[error("pool exhausted: {active} of {max_active} objects active")]
    Exhausted { active: usize, max_active: usize },

    /// Blocking policy waited longer than `max_wait`.
    #[error("wait time exceeded: waited {waited:?} (active: {active}, idle: {idle})")]
    Timeout {
        waited: Duration,
        active: usize,
        idle: usize,
    },

    /// The lifecycle's `create` failed.
    #[error("could not create new object: {source}")]
    CreationFailed {
        #[source]
        source: BoxError,
    },

    /// A freshly created object could not be activated.
    ///
    /// Only raised for objects created by the failing acquisition, so a
    /// permanently broken factory cannot spin `acquire` forever.
    #[error("could not activate new object")]
    ActivationFailed,

    /// The released object is not tracked as active by this pool.
    #[error("object is not a member of this pool")]
    NotMember,

    /// The pool has been shut down.
    #[error("pool stopped")]
    Stopped,

    /// The configuration handed to the constructor is inconsistent.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(&'static str),

    /// I/O error, e.g. the reaper thread could not be spawned.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a lifecycle creation error.
    pub(crate) fn creation(source: impl Into<BoxError>) -> Self {
        Error::CreationFailed {
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Exhausted {
            active: 3,
            max_active: 3,
        };
        assert_eq!(format!("{}", err), "pool exhausted: 3 of 3 objects active");

        assert_eq!(format!("{}", Error::Stopped), "pool stopped");
        assert_eq!(
            format!("{}", Error::NotMember),
            "object is not a member of this pool"
        );
    }

    #[test]
    fn test_timeout_display_carries_counts() {
        let err = Error::Timeout {
            waited: Duration::from_millis(100),
            active: 1,
            idle: 0,
        };
        let display = format!("{}", err);
        assert!(display.contains("100ms"));
        assert!(display.contains("active: 1"));
        assert!(display.contains("idle: 0"));
    }

    #[test]
    fn test_creation_error_has_source() {
        use std::error::Error as _;

        let err = Error::creation("connection refused");
        assert!(err.source().is_some());
        assert_eq!(
            format!("{}", err),
            "could not create new object: connection refused"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }
}
