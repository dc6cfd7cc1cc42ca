//! Error types for repo-retry

use std::fmt;

/// Errors raised while building a retry configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("base_delay must be greater than zero")]
    ZeroBaseDelay,

    #[error("max_delay ({max:?}) must not be shorter than base_delay ({base:?})")]
    MaxBelowBase {
        base: std::time::Duration,
        max: std::time::Duration,
    },

    #[error("{field} is not a valid duration: {value}")]
    InvalidDuration { field: &'static str, value: f64 },
}

/// Outcome of a retry-governed call that did not produce a value.
///
/// `Operation` carries the failure of the last attempt exactly as the unit
/// of work returned it. `Cancelled` is only produced when the executor's
/// cancellation token fired.
#[derive(Debug)]
pub enum RetryError<E> {
    Operation(E),
    Cancelled,
}

impl<E> RetryError<E> {
    /// Returns true if the call was aborted by cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Borrow the original failure, if there is one
    pub fn as_operation(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::Cancelled => None,
        }
    }

    /// Take the original failure, if there is one
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::Cancelled => None,
        }
    }

    /// Convert the wrapped failure, keeping cancellation as is
    pub fn map<F, U>(self, f: F) -> RetryError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            Self::Operation(e) => RetryError::Operation(f(e)),
            Self::Cancelled => RetryError::Cancelled,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(e) => fmt::Display::fmt(e, f),
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Operation(e) => e.source(),
            Self::Cancelled => None,
        }
    }
}
