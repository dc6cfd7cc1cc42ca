//! Subprocess execution for agent CLIs
//!
//! Runs an agent binary with `tokio::process`, captures its output, and
//! turns the result into an [`AgentResponse`] or a classified
//! [`AgentError`].

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AgentError, Result, excerpt};
use crate::types::{AgentResponse, OutputFormat};

/// Everything needed to launch one agent process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Captured output of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or -1 when the process was killed by a signal
    pub code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run a process to completion.
///
/// A missing binary becomes [`AgentError::ProcessNotFound`]. When the
/// timeout expires the child is killed and [`AgentError::Timeout`] is
/// returned. A non-zero exit is *not* an error here; see [`run_agent`].
pub async fn run(command: &CommandSpec) -> Result<ProcessOutput> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .envs(&command.env)
        .stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &command.working_dir {
        cmd.current_dir(dir);
    }

    debug!(program = %command.program, args = command.args.len(), "Spawning agent process");
    let mut child = cmd.spawn().map_err(|e| spawn_error(&command.program, e))?;

    if let (Some(input), Some(mut pipe)) = (command.stdin.clone(), child.stdin.take()) {
        let program = command.program.clone();
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                debug!(program = %program, error = %e, "Agent closed stdin early");
            }
        });
    }

    let wait = child.wait_with_output();
    let output = match command.timeout {
        Some(after) => tokio::time::timeout(after, wait).await.map_err(|_| {
            AgentError::Timeout {
                program: command.program.clone(),
                after,
            }
        })?,
        None => wait.await,
    }
    .map_err(|e| AgentError::Spawn {
        program: command.program.clone(),
        source: e,
    })?;

    let code = output.status.code().unwrap_or(-1);
    debug!(program = %command.program, code, "Agent process finished");

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code,
    })
}

/// Run an agent and parse its reply
pub async fn run_agent(command: &CommandSpec, format: OutputFormat) -> Result<AgentResponse> {
    let output = run(command).await?;
    if !output.success() {
        return Err(AgentError::process_execution(
            &command.program,
            output.code,
            &output.stderr,
            &output.stdout,
        ));
    }
    parse_output(&command.program, &output.stdout, format, output.code)
}

/// Parse agent stdout into a response.
///
/// JSON output may be surrounded by log noise; the outermost `{ ... }` is
/// tried when the whole text does not parse. Text output is wrapped as
/// `{"content": stdout}`.
pub fn parse_output(
    program: &str,
    stdout: &str,
    format: OutputFormat,
    code: i32,
) -> Result<AgentResponse> {
    match format {
        OutputFormat::Text => Ok(AgentResponse::from_text(stdout.trim(), code)),
        OutputFormat::Json => {
            let value = parse_json_lenient(stdout).ok_or_else(|| {
                let shown = stdout.trim();
                if shown.is_empty() {
                    AgentError::malformed(program, "empty output")
                } else {
                    AgentError::malformed(
                        program,
                        format!("output is not JSON: {}", excerpt(shown, 200)),
                    )
                }
            })?;
            AgentResponse::from_value(program, value, code)
        }
    }
}

fn parse_json_lenient(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn spawn_error(program: &str, err: io::Error) -> AgentError {
    if err.kind() == io::ErrorKind::NotFound {
        AgentError::ProcessNotFound {
            program: program.to_string(),
        }
    } else {
        AgentError::Spawn {
            program: program.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_retry::{Classify, FailureKind};

    #[test]
    fn test_parse_plain_json() {
        let response = parse_output(
            "gemini",
            r#"{"response": "This is a test response", "model": "gemini-2.5-pro"}"#,
            OutputFormat::Json,
            0,
        )
        .unwrap();
        assert_eq!(response.content(), "This is a test response");
        assert_eq!(response.model(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn test_parse_json_with_surrounding_noise() {
        let stdout = "Loaded cached credentials.\n{\"content\": \"ok\"}\n";
        let response = parse_output("claude", stdout, OutputFormat::Json, 0).unwrap();
        assert_eq!(response.content(), "ok");
    }

    #[test]
    fn test_parse_non_json_is_malformed_and_permanent() {
        let err = parse_output("claude", "I could not comply", OutputFormat::Json, 0).unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse { .. }));
        assert_eq!(err.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_parse_empty_output() {
        let err = parse_output("claude", "  \n", OutputFormat::Json, 0).unwrap_err();
        assert!(err.to_string().contains("empty output"));
    }

    #[test]
    fn test_parse_text_output() {
        let response = parse_output("claude", "Hello there\n", OutputFormat::Text, 0).unwrap();
        assert_eq!(response.content(), "Hello there");
    }

    #[tokio::test]
    async fn test_missing_binary_is_process_not_found() {
        let command = CommandSpec::new("definitely-not-an-agent-binary-7f3a");
        let err = run(&command).await.unwrap_err();
        assert!(matches!(err, AgentError::ProcessNotFound { .. }));
        assert_eq!(err.failure_kind(), FailureKind::Permanent);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let command = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo 'Rate limit exceeded' >&2; exit 3");
        let err = run_agent(&command, OutputFormat::Json).await.unwrap_err();
        match &err {
            AgentError::ProcessExecution { code, stderr, .. } => {
                assert_eq!(*code, 3);
                assert_eq!(stderr, "Rate limit exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.failure_kind(), FailureKind::RateLimited);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let mut command = CommandSpec::new("sh").arg("-c").arg("cat");
        command.stdin = Some(r#"{"content": "from stdin"}"#.to_string());
        let response = run_agent(&command, OutputFormat::Json).await.unwrap();
        assert_eq!(response.content(), "from stdin");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut command = CommandSpec::new("sh").arg("-c").arg("sleep 5");
        command.timeout = Some(Duration::from_millis(100));
        let err = run(&command).await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }));
        assert_eq!(err.failure_kind(), FailureKind::Transient);
    }
}
