//! Records describing individual attempts and their failures

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{Classify, FailureKind};

/// Kind tag carried by a [`FailureRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    RateLimited,
    Transient,
    Permanent,
    /// The `on_retry` callback failed. Never propagated.
    CallbackError,
}

impl From<FailureKind> for RecordKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::RateLimited => Self::RateLimited,
            FailureKind::Transient => Self::Transient,
            FailureKind::Permanent => Self::Permanent,
        }
    }
}

/// Snapshot of a failure, detached from the error value itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: RecordKind,
    pub message: String,
    pub source_type: String,
}

impl FailureRecord {
    /// Build a record from a classified failure
    pub fn from_failure<E: Classify + ?Sized>(failure: &E) -> Self {
        Self {
            kind: failure.failure_kind().into(),
            message: failure.to_string(),
            source_type: failure.source_type().to_string(),
        }
    }

    /// Record for a failing `on_retry` callback
    pub fn callback_error(message: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::CallbackError,
            message: message.into(),
            source_type: "on_retry".to_string(),
        }
    }

    /// The retry classification, if this record came from the unit of work
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.kind {
            RecordKind::RateLimited => Some(FailureKind::RateLimited),
            RecordKind::Transient => Some(FailureKind::Transient),
            RecordKind::Permanent => Some(FailureKind::Permanent),
            RecordKind::CallbackError => None,
        }
    }
}

/// One scheduled retry: which attempt failed, why, and how long we wait
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// 0-based index of the attempt that just failed
    pub index: u32,
    pub failure: Option<FailureRecord>,
    pub delay_chosen: Duration,
}
