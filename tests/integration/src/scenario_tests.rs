//! Failure-handling scenarios across the agent, retry and workflow crates
//!
//! Every scenario drives real processes (fake agent scripts) so the whole
//! path from exit status and stderr to the caller's error is covered.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use pretty_assertions::assert_eq;
use repo_agent::{AgentError, AgentInvoker, AgentManager, AgentRequest, AgentSettings, GeminiCli};
use repo_retry::{Classify, FailureKind, RecordKind, RetrySettings};
use repo_test_utils::TestRepo;
use repo_test_utils::agents::{
    failing_agent_script, fake_agent_script, flaky_agent_script, json_agent_script, recorded_args,
    run_count,
};
use repo_workflow::{
    BatchOptions, Error, IssueRun, RetryPolicies, WorkflowConfig, WorkflowOrchestrator,
};
use rstest::rstest;
use tempfile::TempDir;

fn quick_retry(max_retries: u32) -> RetrySettings {
    RetrySettings {
        max_retries,
        base_delay_secs: 0.01,
        max_delay_secs: 0.05,
        jitter: false,
    }
}

fn config(claude: &Path, gemini: &Path, max_retries: u32) -> WorkflowConfig {
    WorkflowConfig {
        primary: AgentSettings::claude().with_program(claude.display().to_string()),
        reviewer: AgentSettings::gemini().with_program(gemini.display().to_string()),
        retry: RetryPolicies {
            primary: quick_retry(max_retries),
            reviewer: quick_retry(max_retries),
        },
        ..WorkflowConfig::default()
    }
}

/// Number of separate invocations recorded by a fake agent
fn invocations(dir: &Path, name: &str) -> usize {
    recorded_args(dir, name).iter().filter(|a| *a == "-p").count()
}

// =============================================================================
// Scenario 1: Failure classification from process output
// =============================================================================

mod s1_classification {
    use super::*;
    use pretty_assertions::assert_eq;

    /// S1.1: stderr of a non-zero exit decides the retry class
    #[rstest]
    #[case::rate_limited("429 Too Many Requests", FailureKind::RateLimited)]
    #[case::quota("Quota exceeded for model", FailureKind::RateLimited)]
    #[case::transient("Connection timed out", FailureKind::Transient)]
    #[case::unavailable("503 Service Unavailable", FailureKind::Transient)]
    #[case::permanent("Invalid API key", FailureKind::Permanent)]
    #[tokio::test]
    async fn s1_1_stderr_classification(#[case] stderr: &str, #[case] expected: FailureKind) {
        let dir = TempDir::new().unwrap();
        let script = failing_agent_script(dir.path(), "gemini", 1, stderr);
        let cli =
            GeminiCli::new(AgentSettings::gemini().with_program(script.display().to_string()));

        let err = cli.invoke(&AgentRequest::new("Analyze")).await.unwrap_err();

        assert_eq!(err.failure_kind(), expected);
        assert!(err.to_string().contains(stderr));
    }

    /// S1.2: a missing executable is permanent and reported as not found
    #[tokio::test]
    async fn s1_2_missing_executable() {
        let cli = GeminiCli::new(AgentSettings::gemini().with_program("/nonexistent/bin/gemini"));

        let err = cli.invoke(&AgentRequest::new("Analyze")).await.unwrap_err();

        assert!(matches!(err, AgentError::ProcessNotFound { .. }));
        assert_eq!(err.failure_kind(), FailureKind::Permanent);
    }

    /// S1.3: a hung process is killed at its timeout and classed transient
    #[tokio::test]
    async fn s1_3_timeout() {
        let dir = TempDir::new().unwrap();
        let script = fake_agent_script(dir.path(), "gemini", "sleep 10\nexit 0");
        let cli = GeminiCli::new(
            AgentSettings::gemini()
                .with_program(script.display().to_string())
                .with_timeout(Duration::from_secs(1)),
        );

        let err = cli.invoke(&AgentRequest::new("Analyze")).await.unwrap_err();

        assert!(matches!(err, AgentError::Timeout { .. }));
        assert_eq!(err.failure_kind(), FailureKind::Transient);
    }
}

// =============================================================================
// Scenario 2: Recovery and give-up through the orchestrator
// =============================================================================

mod s2_recovery {
    use super::*;
    use pretty_assertions::assert_eq;

    /// S2.1: transient failures are retried until the agent answers
    #[tokio::test]
    async fn s2_1_transient_failures_recover() {
        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "x"}"#);
        let gemini = flaky_agent_script(
            dir.path(),
            "gemini",
            2,
            "503 Service Unavailable",
            r#"{"response": "Analysis completed after retry"}"#,
        );
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 3)).unwrap();

        let response = orchestrator.analyze_issue("Test issue").await.unwrap();

        assert_eq!(response.content(), "Analysis completed after retry");
        assert_eq!(run_count(dir.path(), "gemini"), 3);
    }

    /// S2.2: with retries disabled the rate-limit failure surfaces as is
    #[tokio::test]
    async fn s2_2_rate_limit_surfaces_original_cause() {
        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "x"}"#);
        let gemini = failing_agent_script(dir.path(), "gemini", 1, "Rate limit exceeded");
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 0)).unwrap();

        let err = orchestrator.analyze_issue("Test issue").await.unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("analyze_issue: "));
        assert!(message.ends_with("exited non-zero (exit code 1): Rate limit exceeded"));
        assert_eq!(err.failure_kind(), Some(FailureKind::RateLimited));
        assert_eq!(invocations(dir.path(), "gemini"), 1);
    }

    /// S2.3: exhausted retries return the last real failure
    #[tokio::test]
    async fn s2_3_exhausted_transient_failure() {
        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "x"}"#);
        let gemini = failing_agent_script(dir.path(), "gemini", 1, "502 Bad Gateway");
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 2)).unwrap();

        let err = orchestrator.validate_fix("issue", "fix").await.unwrap_err();

        assert!(err.to_string().contains("502 Bad Gateway"));
        assert_eq!(invocations(dir.path(), "gemini"), 3);
    }

    /// S2.4: malformed output is permanent and never retried
    #[tokio::test]
    async fn s2_4_malformed_output() {
        let dir = TempDir::new().unwrap();
        let claude = fake_agent_script(dir.path(), "claude", "echo 'I am not JSON'\nexit 0");
        let gemini = json_agent_script(dir.path(), "gemini", r#"{"response": "x"}"#);
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 3)).unwrap();

        let err = orchestrator.propose_fix("issue", "analysis").await.unwrap_err();

        assert!(matches!(
            err.agent_error(),
            Some(AgentError::MalformedResponse { .. })
        ));
        assert_eq!(invocations(dir.path(), "claude"), 1);
    }

    /// S2.5: discovery reports a missing agent as unavailable
    #[tokio::test]
    async fn s2_5_health_check_with_missing_agent() {
        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "x"}"#);

        let manager = AgentManager::discover(&[
            AgentSettings::claude().with_program(claude.display().to_string()),
            AgentSettings::gemini().with_program("/nonexistent/bin/gemini"),
        ])
        .await;

        let health = manager.health_check();
        assert!(!health.available);
        assert!(manager.agent("claude").is_some_and(|a| a.available));
        assert!(manager.agent("gemini").is_some_and(|a| !a.available));
    }
}

// =============================================================================
// Scenario 3: Batches over real processes
// =============================================================================

mod s3_batch {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = r#"case "$*" in
  *broken.py*)
    echo 'Invalid API key' >&2
    exit 1
    ;;
esac
cat <<'JSON'
{"response": "reviewed"}
JSON
exit 0"#;

    fn setup() -> (TempDir, WorkflowOrchestrator) {
        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "x"}"#);
        let gemini = fake_agent_script(dir.path(), "gemini", BODY);
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 1)).unwrap();
        (dir, orchestrator)
    }

    /// S3.1: the default batch stops at the first failing file
    #[tokio::test]
    async fn s3_1_fail_fast() {
        let (dir, orchestrator) = setup();

        let err = orchestrator
            .batch_process(&["broken.py", "fine.py"], "Review this file")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::BatchItem { ref path, .. } if path == Path::new("broken.py")));
        assert_eq!(invocations(dir.path(), "gemini"), 1);
    }

    /// S3.2: continue-on-error keeps going and keeps input order
    #[tokio::test]
    async fn s3_2_continue_on_error_with_concurrency() {
        let (dir, orchestrator) = setup();
        let files = ["one.py", "broken.py", "two.py", "three.py"];

        let report = orchestrator
            .batch_process_with(
                &files,
                "Review this file",
                BatchOptions::continue_on_error().with_concurrency(3),
            )
            .await
            .unwrap();

        let paths: Vec<PathBuf> = report.items().iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths, files.iter().map(PathBuf::from).collect::<Vec<_>>());
        let gaps: Vec<_> = report.gaps().collect();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].1.kind, RecordKind::Permanent);
        assert_eq!(report.completed().count(), 3);
        assert_eq!(invocations(dir.path(), "gemini"), 4);
    }
}

// =============================================================================
// Scenario 4: Inspection feeding a workflow run
// =============================================================================

mod s4_inspection {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID_BRIEF: &str = "# Project Brief

## 🎯 Project Overview

**Project Name**: Sample Service

**Brief Description**: A small Flask service used to exercise the workflow.

**Problem Statement**: Users cannot log in because the password check is inverted.

**Target Users**: Developers and testers

## 📋 Core Requirements

### Functional Requirements
1. Users can log in with a valid password
2. Invalid passwords are rejected
3. Failed attempts are logged

## 🏗️ Technical Preferences

### Technology Stack
**Backend**: Python, Flask

## ✅ Success Criteria

- [x] Login tests pass
- [x] No plaintext passwords stored
";

    /// S4.1: a valid brief lets the run proceed; analysis and brief agree
    #[tokio::test]
    async fn s4_1_brief_and_analysis() {
        let repo = TestRepo::sample_python_project();
        let brief = repo.write("PROJECT_BRIEF.md", VALID_BRIEF);
        assert!(repo_inspect::validate_project_brief(&brief).is_valid);

        let report = repo_inspect::analyze(repo.root()).unwrap();
        assert_eq!(report.file_types.primary_language.as_deref(), Some("Python"));
        assert!(report.documentation.doc_files.contains(&"PROJECT_BRIEF.md".to_string()));

        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "fix"}"#);
        let gemini = json_agent_script(dir.path(), "gemini", r#"{"response": "ok"}"#);
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 0))
            .unwrap()
            .with_repository_context(&report);

        let result = orchestrator
            .resolve_issue(&IssueRun::new(5, "Login fails").with_brief(&brief))
            .await
            .unwrap();

        assert_eq!(result.context.len(), 4);
        assert!(result.analysis.is_none());
    }

    /// S4.2: a missing brief stops the run before any agent is called
    #[tokio::test]
    async fn s4_2_missing_brief() {
        let repo = TestRepo::new();
        let dir = TempDir::new().unwrap();
        let claude = json_agent_script(dir.path(), "claude", r#"{"content": "fix"}"#);
        let gemini = json_agent_script(dir.path(), "gemini", r#"{"response": "ok"}"#);
        let orchestrator = WorkflowOrchestrator::from_config(&config(&claude, &gemini, 0)).unwrap();

        let err = orchestrator
            .resolve_issue(&IssueRun::new(5, "x").with_brief(repo.path("PROJECT_BRIEF.md")))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::InvalidBrief { ref errors } if errors[0].contains("not found"))
        );
        assert_eq!(invocations(dir.path(), "gemini"), 0);
    }
}
