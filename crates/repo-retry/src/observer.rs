//! Retry event observers
//!
//! The executor never prints. Every decision it makes is reported to a
//! [`RetryObserver`]; the default [`TracingObserver`] turns them into
//! `tracing` events.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::record::{Attempt, FailureRecord};

/// Why the executor stopped retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The failure was classified permanent
    Permanent,
    /// All `max_retries` retries were used
    Exhausted,
}

/// Receives retry-loop events. All methods default to doing nothing.
pub trait RetryObserver: Send + Sync {
    /// A retry has been scheduled after a failed attempt
    fn retry_scheduled(&self, _attempt: &Attempt) {}

    /// The call failed for good and the failure is being returned
    fn gave_up(&self, _attempt: u32, _failure: &FailureRecord, _reason: GiveUpReason) {}

    /// The `on_retry` callback failed; the loop continues regardless
    fn callback_failed(&self, _attempt: u32, _failure: &FailureRecord) {}

    /// The call was cancelled while on `attempt`
    fn cancelled(&self, _attempt: u32) {}

    /// The unit of work succeeded after `attempts` tries
    fn succeeded(&self, _attempts: u32) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {}

/// Observer that logs through `tracing`
#[derive(Debug, Clone)]
pub struct TracingObserver {
    policy: String,
}

impl TracingObserver {
    /// `policy` names the call site in every event, e.g. `"reviewer-policy"`
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("default")
    }
}

impl RetryObserver for TracingObserver {
    fn retry_scheduled(&self, attempt: &Attempt) {
        let (kind, message) = attempt
            .failure
            .as_ref()
            .map(|f| (format!("{:?}", f.kind), f.message.as_str()))
            .unwrap_or_default();
        warn!(
            policy = %self.policy,
            attempt = attempt.index + 1,
            delay_secs = attempt.delay_chosen.as_secs_f64(),
            kind = %kind,
            error = %message,
            "Retrying after failure"
        );
    }

    fn gave_up(&self, attempt: u32, failure: &FailureRecord, reason: GiveUpReason) {
        match reason {
            GiveUpReason::Permanent => warn!(
                policy = %self.policy,
                attempt = attempt + 1,
                source_type = %failure.source_type,
                error = %failure.message,
                "Non-retryable failure"
            ),
            GiveUpReason::Exhausted => warn!(
                policy = %self.policy,
                attempts = attempt + 1,
                error = %failure.message,
                "Retries exhausted"
            ),
        }
    }

    fn callback_failed(&self, attempt: u32, failure: &FailureRecord) {
        warn!(
            policy = %self.policy,
            attempt = attempt + 1,
            error = %failure.message,
            "on_retry callback failed"
        );
    }

    fn cancelled(&self, attempt: u32) {
        info!(policy = %self.policy, attempt = attempt + 1, "Retry loop cancelled");
    }

    fn succeeded(&self, attempts: u32) {
        if attempts > 1 {
            debug!(policy = %self.policy, attempts, "Succeeded after retries");
        }
    }
}

/// One event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum RetryEvent {
    Scheduled(Attempt),
    GaveUp {
        attempt: u32,
        failure: FailureRecord,
        reason: GiveUpReason,
    },
    CallbackFailed {
        attempt: u32,
        failure: FailureRecord,
    },
    Cancelled {
        attempt: u32,
    },
    Succeeded {
        attempts: u32,
    },
}

/// Observer that keeps every event in memory, in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RetryEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<RetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The attempts for which a retry was scheduled
    pub fn scheduled(&self) -> Vec<Attempt> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RetryEvent::Scheduled(attempt) => Some(attempt),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: RetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl RetryObserver for RecordingObserver {
    fn retry_scheduled(&self, attempt: &Attempt) {
        self.push(RetryEvent::Scheduled(attempt.clone()));
    }

    fn gave_up(&self, attempt: u32, failure: &FailureRecord, reason: GiveUpReason) {
        self.push(RetryEvent::GaveUp {
            attempt,
            failure: failure.clone(),
            reason,
        });
    }

    fn callback_failed(&self, attempt: u32, failure: &FailureRecord) {
        self.push(RetryEvent::CallbackFailed {
            attempt,
            failure: failure.clone(),
        });
    }

    fn cancelled(&self, attempt: u32) {
        self.push(RetryEvent::Cancelled { attempt });
    }

    fn succeeded(&self, attempts: u32) {
        self.push(RetryEvent::Succeeded { attempts });
    }
}
