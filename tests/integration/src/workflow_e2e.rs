//! End-to-end workflow run through fake agent executables
//!
//! This test exercises the complete flow: configuration file -> repository
//! analysis -> issue resolution with both agents running as real processes.
#![cfg(unix)]

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use repo_agent::AgentManager;
use repo_test_utils::TestRepo;
use repo_test_utils::agents::{fake_agent_script, json_agent_script, recorded_args};
use repo_workflow::{IssueRun, Task, WorkflowConfig, WorkflowOrchestrator};
use tempfile::TempDir;

/// Gemini stand-in that answers by the task named in its prompt
const REVIEWER_BODY: &str = r#"case "$*" in
  *"Analyze the following issue"*)
    cat <<'JSON'
{"response": "{\"summary\": \"password check is inverted\", \"complexity\": \"medium\", \"affected_files\": [\"src/auth.py\"]}", "model": "gemini-2.5-pro"}
JSON
    ;;
  *"Check whether the fix"*)
    cat <<'JSON'
{"response": "{\"resolves_issue\": true, \"concerns\": []}"}
JSON
    ;;
  *"Review the changes"*)
    cat <<'JSON'
{"response": "No problems found"}
JSON
    ;;
  *"Write a pull request"*)
    cat <<'JSON'
{"response": "Fix inverted password check. Closes #42"}
JSON
    ;;
  *)
    echo "unexpected prompt" >&2
    exit 1
    ;;
esac
exit 0"#;

struct Agents {
    dir: TempDir,
    claude: PathBuf,
    gemini: PathBuf,
}

fn fake_agents() -> Agents {
    let dir = TempDir::new().unwrap();
    let claude = json_agent_script(
        dir.path(),
        "claude",
        r#"{"content": "Compare with bcrypt.checkpw instead of ==", "model": "claude-sonnet-4-5"}"#,
    );
    let gemini = fake_agent_script(dir.path(), "gemini", REVIEWER_BODY);
    Agents { dir, claude, gemini }
}

fn write_config(dir: &Path, agents: &Agents) -> PathBuf {
    let path = dir.join("workflow.toml");
    std::fs::write(
        &path,
        format!(
            r#"[primary]
kind = "claude"
program = "{claude}"
timeout_secs = 30

[reviewer]
kind = "gemini"
program = "{gemini}"
timeout_secs = 30

[retry.primary]
max_retries = 2
base_delay_secs = 0.01
max_delay_secs = 0.05

[retry.reviewer]
max_retries = 2
base_delay_secs = 0.01
max_delay_secs = 0.05

[batch]
concurrency = 2
"#,
            claude = agents.claude.display(),
            gemini = agents.gemini.display(),
        ),
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_issue_resolution_end_to_end() {
    repo_test_utils::init_tracing();
    let repo = TestRepo::sample_python_project();
    let agents = fake_agents();
    let config = WorkflowConfig::load(&write_config(agents.dir.path(), &agents)).unwrap();

    let manager = AgentManager::discover(&[config.primary.clone(), config.reviewer.clone()]).await;
    assert!(manager.health_check().available);

    let report = repo_inspect::analyze(repo.root()).unwrap();
    let orchestrator = WorkflowOrchestrator::from_config(&config)
        .unwrap()
        .with_repository_context(&report);

    let run = IssueRun::new(42, "Login fails for valid passwords")
        .with_changed_files([repo.path("src/auth.py"), repo.path("src/user.py")]);
    let result = orchestrator.resolve_issue(&run).await.unwrap();

    assert_eq!(
        result.context.tasks(),
        vec![
            Task::AnalyzeIssue,
            Task::ProposeFix,
            Task::ValidateFix,
            Task::ReviewCodeChanges,
            Task::ReviewCodeChanges,
            Task::GeneratePrDescription,
        ]
    );
    assert!(result.is_complete());
    assert_eq!(
        result.analysis.as_ref().and_then(|a| a.get("complexity")),
        Some(&serde_json::json!("medium"))
    );
    assert_eq!(
        result.analysis().and_then(|a| a.model()),
        Some("gemini-2.5-pro")
    );
    assert_eq!(
        result.pr_description().unwrap().content(),
        "Fix inverted password check. Closes #42"
    );

    // Agent A wrote the fix with the repository on its read path
    let claude_args = recorded_args(agents.dir.path(), "claude");
    assert!(claude_args.iter().any(|a| a.contains("password check is inverted")));
    assert!(claude_args.iter().any(|a| a == "--add-dir"));
    assert!(claude_args.contains(&repo.root().display().to_string()));

    // Agent B saw both changed files and the repository summary
    let gemini_args = recorded_args(agents.dir.path(), "gemini");
    let root = repo.root().display().to_string();
    assert!(gemini_args.iter().any(|a| a.contains("@") && a.contains("src/auth.py")));
    assert!(gemini_args.iter().any(|a| a.contains("@") && a.contains("src/user.py")));
    assert!(gemini_args.iter().any(|a| a.contains("Primary language: Python")));
    assert!(gemini_args.iter().any(|a| a.contains(&root)));
}

#[tokio::test]
async fn test_generate_documentation_through_process() {
    let repo = TestRepo::sample_python_project();
    let dir = TempDir::new().unwrap();
    let gemini = json_agent_script(
        dir.path(),
        "gemini",
        r##"{"response": "# auth.py\n\nAuthenticator checks passwords with bcrypt."}"##,
    );
    let claude = json_agent_script(dir.path(), "claude", r#"{"content": "unused"}"#);
    let agents = Agents {
        dir,
        claude,
        gemini,
    };
    let config = WorkflowConfig::load(&write_config(agents.dir.path(), &agents)).unwrap();

    let response = WorkflowOrchestrator::from_config(&config)
        .unwrap()
        .generate_documentation(repo.path("src/auth.py"))
        .await
        .unwrap();

    assert!(response.content().starts_with("# auth.py"));
    assert!(recorded_args(agents.dir.path(), "claude").is_empty());
}
