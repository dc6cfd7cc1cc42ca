//! Error types for agent operations

use std::io;
use std::time::Duration;

use repo_retry::{Classify, FailureKind};

/// Longest stderr excerpt kept in a [`AgentError::ProcessExecution`]
pub const STDERR_EXCERPT_LIMIT: usize = 2000;

/// Errors that can occur while invoking an agent
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent executable is not installed or not on PATH
    #[error("{program} not found. Install it or set its path in the workflow configuration.")]
    ProcessNotFound {
        /// The program that was looked up
        program: String,
    },

    /// The process could not be started for a reason other than a missing binary
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process exited with a non-zero status
    #[error("{program} exited non-zero (exit code {code}): {stderr}")]
    ProcessExecution {
        program: String,
        /// Exit code, or -1 when the process was killed by a signal
        code: i32,
        /// Captured stderr (stdout if stderr was empty), truncated
        stderr: String,
        /// Classified from the complete output, before truncation
        kind: FailureKind,
    },

    /// The process did not finish within its configured timeout
    #[error("{program} timed out after {}s", .after.as_secs_f64())]
    Timeout { program: String, after: Duration },

    /// The process succeeded but its output has no usable shape
    #[error("Malformed response from {program}: {message}")]
    MalformedResponse { program: String, message: String },
}

impl AgentError {
    /// Build a [`AgentError::ProcessExecution`] from captured output
    pub fn process_execution(program: &str, code: i32, stderr: &str, stdout: &str) -> Self {
        let text = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        let text = text.trim();
        Self::ProcessExecution {
            program: program.to_string(),
            code,
            stderr: excerpt(text, STDERR_EXCERPT_LIMIT),
            kind: repo_retry::classify("ProcessExecutionError", text),
        }
    }

    pub fn malformed(program: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            program: program.to_string(),
            message: message.into(),
        }
    }

    /// The program this error came from
    pub fn program(&self) -> &str {
        match self {
            Self::ProcessNotFound { program }
            | Self::Spawn { program, .. }
            | Self::ProcessExecution { program, .. }
            | Self::Timeout { program, .. }
            | Self::MalformedResponse { program, .. } => program,
        }
    }
}

impl Classify for AgentError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ProcessNotFound { .. } | Self::MalformedResponse { .. } => FailureKind::Permanent,
            Self::Spawn { source, .. } => source.failure_kind(),
            Self::ProcessExecution { kind, .. } => *kind,
            Self::Timeout { .. } => FailureKind::Transient,
        }
    }

    fn source_type(&self) -> &'static str {
        match self {
            Self::ProcessNotFound { .. } => "ProcessNotFound",
            Self::Spawn { .. } => "Spawn",
            Self::ProcessExecution { .. } => "ProcessExecution",
            Self::Timeout { .. } => "Timeout",
            Self::MalformedResponse { .. } => "MalformedResponse",
        }
    }
}

/// Truncate `text` to at most `limit` characters, marking the cut
pub(crate) fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
