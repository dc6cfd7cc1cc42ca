//! Error types for repo-workflow

use std::path::PathBuf;

use repo_agent::AgentError;
use repo_retry::{Classify, FailureKind};

use crate::task::Task;

/// Result type for repo-workflow
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task's agent call failed. `source` is the last attempt's failure,
    /// unchanged.
    #[error("{task}: {source}")]
    Agent {
        task: Task,
        #[source]
        source: AgentError,
    },

    #[error("{task} on {}: {source}", .path.display())]
    BatchItem {
        task: Task,
        path: PathBuf,
        #[source]
        source: AgentError,
    },

    #[error("{task} cancelled")]
    Cancelled { task: Task },

    #[error("Project brief is invalid: {}", .errors.join("; "))]
    InvalidBrief { errors: Vec<String> },

    #[error(transparent)]
    Inspect(#[from] repo_inspect::InspectError),

    #[error("Invalid configuration in [{section}]: {message}")]
    InvalidConfig { section: String, message: String },

    #[error("Failed to parse {format} config {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn invalid_config(section: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidConfig {
            section: section.into(),
            message: message.to_string(),
        }
    }

    /// The agent failure behind this error, if any
    pub fn agent_error(&self) -> Option<&AgentError> {
        match self {
            Self::Agent { source, .. } | Self::BatchItem { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Retry classification of the underlying agent failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.agent_error().map(Classify::failure_kind)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The task that failed, for task errors
    pub fn task(&self) -> Option<Task> {
        match self {
            Self::Agent { task, .. } | Self::BatchItem { task, .. } | Self::Cancelled { task } => {
                Some(*task)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_keeps_cause_in_message() {
        let err = Error::Agent {
            task: Task::AnalyzeIssue,
            source: AgentError::process_execution("gemini", 1, "Rate limit exceeded", ""),
        };
        assert_eq!(
            err.to_string(),
            "analyze_issue: gemini exited non-zero (exit code 1): Rate limit exceeded"
        );
        assert_eq!(err.failure_kind(), Some(FailureKind::RateLimited));
        assert_eq!(err.task(), Some(Task::AnalyzeIssue));
    }

    #[test]
    fn test_batch_item_names_the_file() {
        let err = Error::BatchItem {
            task: Task::BatchProcess,
            path: PathBuf::from("a.py"),
            source: AgentError::malformed("claude", "empty output"),
        };
        assert!(err.to_string().starts_with("batch_process on a.py: "));
        assert_eq!(err.failure_kind(), Some(FailureKind::Permanent));
    }

    #[test]
    fn test_cancelled_has_no_agent_error() {
        let err = Error::Cancelled {
            task: Task::ValidateFix,
        };
        assert!(err.is_cancelled());
        assert!(err.agent_error().is_none());
        assert_eq!(err.to_string(), "validate_fix cancelled");
    }
}
