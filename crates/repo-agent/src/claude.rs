//! Agent A: the `claude` CLI

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::invoker::AgentInvoker;
use crate::settings::AgentSettings;
use crate::subprocess::{CommandSpec, run_agent};
use crate::types::{AgentFlag, AgentRequest, AgentResponse};

/// Invokes `claude -p <prompt>` in non-interactive print mode
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    settings: AgentSettings,
}

impl ClaudeCli {
    pub fn new(settings: AgentSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Command-line arguments for `request`
    pub fn build_args(&self, request: &AgentRequest) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            request.prompt_with_file_refs(),
            "--output-format".to_string(),
            self.settings.output_format.as_str().to_string(),
        ];

        if let Some(system_prompt) = &request.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }

        if let Some(model) = request.model.as_ref().or(self.settings.model.as_ref()) {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if let Some(mode) = permission_mode(request) {
            args.push("--permission-mode".to_string());
            args.push(mode.to_string());
        }

        if request.has_flag(AgentFlag::ContinueConversation) {
            args.push("--continue".to_string());
        }
        if request.has_flag(AgentFlag::Verbose) {
            args.push("--verbose".to_string());
        }

        if !request.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(request.allowed_tools.join(","));
        }

        if let Some(mcp) = &request.mcp_config {
            args.push("--mcp-config".to_string());
            args.push(mcp.display().to_string());
        }

        for dir in &request.context_paths {
            args.push("--add-dir".to_string());
            args.push(dir.display().to_string());
        }

        args
    }

    /// Full process description for `request`
    pub fn command(&self, request: &AgentRequest) -> CommandSpec {
        CommandSpec {
            program: self.settings.program().to_string(),
            args: self.build_args(request),
            working_dir: self.settings.working_dir.clone(),
            env: self.settings.env.clone(),
            stdin: request.stdin.clone(),
            timeout: self.settings.timeout(),
        }
    }
}

/// The most restrictive requested permission mode wins
fn permission_mode(request: &AgentRequest) -> Option<&'static str> {
    if request.has_flag(AgentFlag::PlanOnly) {
        Some("plan")
    } else if request.has_flag(AgentFlag::AcceptEdits) {
        Some("acceptEdits")
    } else if request.has_flag(AgentFlag::AutoApprove) {
        Some("bypassPermissions")
    } else {
        None
    }
}

#[async_trait]
impl AgentInvoker for ClaudeCli {
    fn name(&self) -> &str {
        self.settings.name()
    }

    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse> {
        let spec = self.command(request);
        debug!(
            program = %spec.program,
            files = request.file_paths.len(),
            "Invoking claude"
        );
        run_agent(&spec, self.settings.output_format).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputFormat;
    use pretty_assertions::assert_eq;

    fn cli() -> ClaudeCli {
        ClaudeCli::new(AgentSettings::claude())
    }

    #[test]
    fn test_minimal_args() {
        let args = cli().build_args(&AgentRequest::new("Write a hello world function"));
        assert_eq!(
            args,
            vec!["-p", "Write a hello world function", "--output-format", "json"]
        );
    }

    #[test]
    fn test_file_reference_in_prompt() {
        let request = AgentRequest::new("Review this code").with_file("/tmp/ws/sample.py");
        let args = cli().build_args(&request);
        assert_eq!(args[1], "Review this code\n\n@/tmp/ws/sample.py");
    }

    #[test]
    fn test_all_options() {
        let request = AgentRequest::new("Fix it")
            .with_system_prompt("You are a careful engineer")
            .with_model("claude-sonnet-4-5")
            .with_flag(AgentFlag::AcceptEdits)
            .with_flag(AgentFlag::ContinueConversation)
            .with_flag(AgentFlag::Verbose)
            .with_allowed_tools(["Read", "Edit"])
            .with_mcp_config("mcp.json")
            .with_context_path("../shared");
        let args = cli().build_args(&request);

        let expect_pair = |flag: &str, value: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            assert_eq!(args[i + 1], value, "value for {flag}");
        };
        expect_pair("--system-prompt", "You are a careful engineer");
        expect_pair("--model", "claude-sonnet-4-5");
        expect_pair("--permission-mode", "acceptEdits");
        expect_pair("--allowedTools", "Read,Edit");
        expect_pair("--mcp-config", "mcp.json");
        expect_pair("--add-dir", "../shared");
        assert!(args.contains(&"--continue".to_string()));
        assert!(args.contains(&"--verbose".to_string()));
    }

    #[test]
    fn test_plan_only_beats_auto_approve() {
        let request = AgentRequest::new("Plan")
            .with_flag(AgentFlag::AutoApprove)
            .with_flag(AgentFlag::PlanOnly);
        let args = cli().build_args(&request);
        let i = args.iter().position(|a| a == "--permission-mode").unwrap();
        assert_eq!(args[i + 1], "plan");
        assert_eq!(args.iter().filter(|a| *a == "--permission-mode").count(), 1);
    }

    #[test]
    fn test_request_model_overrides_settings() {
        let cli = ClaudeCli::new(AgentSettings::claude().with_model("claude-opus-4-1"));
        let args = cli.build_args(&AgentRequest::new("x").with_model("claude-haiku-4-5"));
        let i = args.iter().position(|a| a == "--model").unwrap();
        assert_eq!(args[i + 1], "claude-haiku-4-5");
    }

    #[test]
    fn test_command_carries_settings() {
        let mut settings = AgentSettings::claude()
            .with_program("/usr/local/bin/claude")
            .with_env("CLAUDE_CONFIG_DIR", "/tmp/cfg");
        settings.output_format = OutputFormat::Text;
        settings.timeout_secs = Some(30);

        let spec = ClaudeCli::new(settings).command(&AgentRequest::new("hi").with_stdin("input"));
        assert_eq!(spec.program, "/usr/local/bin/claude");
        assert_eq!(spec.args[3], "text");
        assert_eq!(spec.stdin.as_deref(), Some("input"));
        assert_eq!(spec.timeout, Some(std::time::Duration::from_secs(30)));
        assert_eq!(spec.env.get("CLAUDE_CONFIG_DIR").map(String::as_str), Some("/tmp/cfg"));
    }
}
