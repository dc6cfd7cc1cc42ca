//! Failure classification
//!
//! Adapters at the process boundary report a [`FailureKind`] for each of
//! their own error variants through [`Classify`]. The keyword classifier in
//! this module is the fallback for failures that only carry a type name and
//! a message: captured process stderr, or third-party errors wrapped in
//! [`Opaque`].

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

/// Type names that always mean the remote side is rate limiting us
pub const RATE_LIMIT_TYPES: &[&str] = &["RateLimitExceededException"];

/// Message fragments that indicate rate limiting (matched lower-cased)
pub const RATE_LIMIT_KEYWORDS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "429",
    "quota exceeded",
    "throttle",
];

/// Type names of well-known connection, timeout and server-side failures
pub const TRANSIENT_TYPES: &[&str] = &[
    "ConnectionError",
    "TimeoutError",
    "Timeout",
    "ConnectTimeout",
    "ReadTimeout",
    "HTTPError",
    "RequestException",
    "APIConnectionError",
    "APITimeoutError",
    "InternalServerError",
];

/// Message fragments that indicate a transient failure (matched lower-cased)
pub const TRANSIENT_KEYWORDS: &[&str] = &[
    "connection",
    "timeout",
    "timed out",
    "network",
    "temporary",
    "unavailable",
    "service unavailable",
    "500",
    "502",
    "503",
    "504",
    "internal server error",
    "bad gateway",
    "gateway timeout",
];

/// How a failure should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The remote side asked us to slow down. Retried with a 30s floor.
    RateLimited,
    /// Worth another attempt after a backoff wait.
    Transient,
    /// Retrying cannot help. Surfaced immediately.
    Permanent,
}

impl FailureKind {
    /// Whether the retry loop may attempt the call again
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Permanent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a failure from its type name and message.
///
/// Rate limiting wins over transient; anything unmatched is permanent.
pub fn classify(source_type: &str, message: &str) -> FailureKind {
    if is_rate_limited(source_type, message) {
        FailureKind::RateLimited
    } else if is_transient(source_type, message) {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

/// Check for rate limiting by type name or message keyword
pub fn is_rate_limited(source_type: &str, message: &str) -> bool {
    if RATE_LIMIT_TYPES.contains(&source_type) {
        return true;
    }
    let lowered = message.to_lowercase();
    RATE_LIMIT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Check for transient failures by type name or message keyword.
///
/// Does not look at rate-limit indicators; use [`classify`] for the full
/// decision.
pub fn is_transient(source_type: &str, message: &str) -> bool {
    if TRANSIENT_TYPES.contains(&source_type) {
        return true;
    }
    let lowered = message.to_lowercase();
    TRANSIENT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// A failure that knows how it should be retried.
pub trait Classify: fmt::Display {
    /// The retry classification of this failure
    fn failure_kind(&self) -> FailureKind;

    /// Short type tag used in failure records and logs
    fn source_type(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strip module paths and generic parameters from a type name
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Wrapper for failures from sources that do not classify themselves.
///
/// Classification falls back to the keyword rules applied to the wrapped
/// type's short name and display text.
#[derive(Debug)]
pub struct Opaque<E>(pub E);

impl<E> Opaque<E> {
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<E: fmt::Display> fmt::Display for Opaque<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: std::error::Error> std::error::Error for Opaque<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl<E: fmt::Display> Classify for Opaque<E> {
    fn failure_kind(&self) -> FailureKind {
        classify(self.source_type(), &self.0.to_string())
    }

    fn source_type(&self) -> &'static str {
        short_type_name(std::any::type_name::<E>())
    }
}

impl Classify for io::Error {
    fn failure_kind(&self) -> FailureKind {
        match classify("io::Error", &self.to_string()) {
            FailureKind::Permanent if is_transient_io_kind(self.kind()) => FailureKind::Transient,
            kind => kind,
        }
    }

    fn source_type(&self) -> &'static str {
        "io::Error"
    }
}

/// I/O error kinds that describe a temporary condition
pub fn is_transient_io_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
    )
}
