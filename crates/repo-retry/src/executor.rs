//! The retry loop

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::classify::Classify;
use crate::config::RetryConfig;
use crate::error::RetryError;
use crate::observer::{GiveUpReason, RetryObserver, TracingObserver};
use crate::record::{Attempt, FailureRecord};

/// Runs a unit of work under a [`RetryConfig`].
///
/// Attempts are strictly sequential. A permanent failure is returned at once,
/// a retryable one is retried after a backoff wait until `max_retries`
/// retries have been used, and the last real failure is returned unchanged.
/// Cancelling the token aborts both a running attempt and a pending wait.
#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    backoff: BackoffPolicy,
    observer: Arc<dyn RetryObserver>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            backoff: BackoffPolicy::default(),
            observer: Arc::new(TracingObserver::default()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Abort attempts and waits when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `work` until it succeeds, fails permanently, runs out of retries,
    /// or is cancelled.
    pub async fn execute<T, E, F, Fut>(&self, mut work: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let max_retries = self.config.max_retries();
        let mut attempt: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.observer.cancelled(attempt);
                    return Err(RetryError::Cancelled);
                }
                outcome = work() => outcome,
            };

            let failure = match outcome {
                Ok(value) => {
                    self.observer.succeeded(attempt + 1);
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let kind = failure.failure_kind();
            let record = FailureRecord::from_failure(&failure);

            if !kind.is_retryable() {
                self.observer
                    .gave_up(attempt, &record, GiveUpReason::Permanent);
                return Err(RetryError::Operation(failure));
            }
            if attempt >= max_retries {
                self.observer
                    .gave_up(attempt, &record, GiveUpReason::Exhausted);
                return Err(RetryError::Operation(failure));
            }

            let delay = self.backoff.delay_for(attempt, &self.config, kind);
            self.observer.retry_scheduled(&Attempt {
                index: attempt,
                failure: Some(record.clone()),
                delay_chosen: delay,
            });
            self.notify_on_retry(&record, attempt);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.observer.cancelled(attempt);
                    return Err(RetryError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    /// Invoke the configured callback. Errors and panics are reported to the
    /// observer and go no further.
    fn notify_on_retry(&self, record: &FailureRecord, attempt: u32) {
        let Some(callback) = self.config.on_retry() else {
            return;
        };

        let message = match catch_unwind(AssertUnwindSafe(|| callback(record, attempt))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("on_retry panicked: {}", panic_message(payload.as_ref())),
        };
        self.observer
            .callback_failed(attempt, &FailureRecord::callback_error(message));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
