//! Failure classification and retry execution for Repository Manager
//!
//! Every call to an external agent process goes through a [`RetryExecutor`].
//! The executor:
//!
//! - Classifies each failure as rate limited, transient or permanent
//! - Fails fast on permanent failures
//! - Waits an exponentially growing, optionally jittered delay between attempts
//! - Reports retry events to a pluggable [`RetryObserver`]
//! - Aborts pending waits when its cancellation token fires
//!
//! The original failure is always what the caller gets back. There is no
//! synthetic "retries exhausted" error.

pub mod backoff;
pub mod classify;
pub mod config;
pub mod error;
pub mod executor;
pub mod observer;
pub mod record;

pub use backoff::{BackoffPolicy, FixedJitter, JitterSource, SeededJitter, ThreadJitter};
pub use classify::{Classify, FailureKind, Opaque, classify};
pub use config::{CallbackError, RetryCallback, RetryConfig, RetrySettings};
pub use error::{ConfigError, RetryError};
pub use executor::RetryExecutor;
pub use observer::{
    GiveUpReason, NoopObserver, RecordingObserver, RetryEvent, RetryObserver, TracingObserver,
};
pub use record::{Attempt, FailureRecord, RecordKind};

pub use tokio_util::sync::CancellationToken;
