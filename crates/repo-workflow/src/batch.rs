//! Batch processing modes and per-item results

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use repo_agent::AgentResponse;
use repo_retry::FailureRecord;

/// What a batch does when one item's call fails for good
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Abort the batch with the failing item's error
    #[default]
    FailFast,
    /// Record the failure as a gap and go on with the next item
    ContinueOnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub mode: BatchMode,
    /// Items in flight at once. Results always come back in input order.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            mode: BatchMode::FailFast,
            concurrency: 1,
        }
    }
}

impl BatchOptions {
    pub fn fail_fast() -> Self {
        Self::default()
    }

    pub fn continue_on_error() -> Self {
        Self {
            mode: BatchMode::ContinueOnError,
            ..Self::default()
        }
    }

    /// Values below 1 are treated as 1
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed { response: AgentResponse },
    Failed { failure: FailureRecord },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub path: PathBuf,
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn response(&self) -> Option<&AgentResponse> {
        match &self.outcome {
            BatchOutcome::Completed { response } => Some(response),
            BatchOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match &self.outcome {
            BatchOutcome::Completed { .. } => None,
            BatchOutcome::Failed { failure } => Some(failure),
        }
    }
}

/// One entry per input path, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    items: Vec<BatchItem>,
}

impl BatchReport {
    pub(crate) fn new(items: Vec<BatchItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when no item failed
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|item| item.failure().is_none())
    }

    pub fn completed(&self) -> impl Iterator<Item = (&Path, &AgentResponse)> {
        self.items
            .iter()
            .filter_map(|item| item.response().map(|r| (item.path.as_path(), r)))
    }

    pub fn gaps(&self) -> impl Iterator<Item = (&Path, &FailureRecord)> {
        self.items
            .iter()
            .filter_map(|item| item.failure().map(|f| (item.path.as_path(), f)))
    }

    /// Successful responses in input order, gaps dropped
    pub fn into_responses(self) -> Vec<AgentResponse> {
        self.items
            .into_iter()
            .filter_map(|item| match item.outcome {
                BatchOutcome::Completed { response } => Some(response),
                BatchOutcome::Failed { .. } => None,
            })
            .collect()
    }
}
