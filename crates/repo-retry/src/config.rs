//! Retry configuration
//!
//! [`RetryConfig`] is the validated, immutable policy handed to an executor.
//! [`RetrySettings`] is its serializable form as it appears in
//! configuration files.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::record::FailureRecord;

/// Error type a retry callback may return
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Called with the failure and the 0-based attempt index each time a retry
/// is scheduled. Errors and panics are caught by the executor.
pub type RetryCallback =
    Arc<dyn Fn(&FailureRecord, u32) -> Result<(), CallbackError> + Send + Sync>;

/// Immutable retry policy for one call site
#[derive(Clone)]
pub struct RetryConfig {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
    on_retry: Option<RetryCallback>,
}

impl RetryConfig {
    /// Create a policy with jitter enabled and no callback.
    ///
    /// Fails if `base_delay` is zero or `max_delay < base_delay`.
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if base_delay.is_zero() {
            return Err(ConfigError::ZeroBaseDelay);
        }
        if max_delay < base_delay {
            return Err(ConfigError::MaxBelowBase {
                base: base_delay,
                max: max_delay,
            });
        }
        Ok(Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: true,
            on_retry: None,
        })
    }

    /// 3 retries, 1s base, 60s cap, jitter on
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
            on_retry: None,
        }
    }

    /// Policy for agent CLI and remote API calls: 3 retries, 2s base, 120s cap
    pub fn agent_default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            jitter: true,
            on_retry: None,
        }
    }

    /// Never retry
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Register a callback invoked on every scheduled retry
    pub fn with_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FailureRecord, u32) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    pub fn on_retry(&self) -> Option<&RetryCallback> {
        self.on_retry.as_ref()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Serializable retry policy, delays in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 2.0,
            max_delay_secs: 120.0,
            jitter: true,
        }
    }
}

impl RetrySettings {
    /// Validate and convert into an executor policy
    pub fn to_config(&self) -> Result<RetryConfig, ConfigError> {
        let base = secs_to_duration("base_delay_secs", self.base_delay_secs)?;
        let max = secs_to_duration("max_delay_secs", self.max_delay_secs)?;
        Ok(RetryConfig::new(self.max_retries, base, max)?.with_jitter(self.jitter))
    }
}

fn secs_to_duration(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}
