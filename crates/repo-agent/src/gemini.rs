//! Agent B: the `gemini` CLI

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::invoker::AgentInvoker;
use crate::settings::AgentSettings;
use crate::subprocess::{CommandSpec, run_agent};
use crate::types::{AgentFlag, AgentRequest, AgentResponse};

/// Invokes `gemini -p <prompt>` non-interactively.
///
/// The gemini CLI has no system-prompt option, so a system prompt is
/// prepended to the prompt text. Flags it cannot express are dropped with a
/// debug log.
#[derive(Debug, Clone)]
pub struct GeminiCli {
    settings: AgentSettings,
}

impl GeminiCli {
    pub fn new(settings: AgentSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn build_args(&self, request: &AgentRequest) -> Vec<String> {
        let prompt = match &request.system_prompt {
            Some(system) => format!("{}\n\n{}", system, request.prompt_with_file_refs()),
            None => request.prompt_with_file_refs(),
        };

        let mut args = vec![
            "-p".to_string(),
            prompt,
            "--output-format".to_string(),
            self.settings.output_format.as_str().to_string(),
        ];

        if let Some(model) = request.model.as_ref().or(self.settings.model.as_ref()) {
            args.push("-m".to_string());
            args.push(model.clone());
        }

        if request.has_flag(AgentFlag::PlanOnly) {
            // No plan mode: leave approvals at the interactive default
            debug!("gemini has no plan mode; not passing approval flags");
        } else if request.has_flag(AgentFlag::AcceptEdits) {
            args.push("--approval-mode".to_string());
            args.push("auto_edit".to_string());
        } else if request.has_flag(AgentFlag::AutoApprove) {
            args.push("--yolo".to_string());
        }

        if request.has_flag(AgentFlag::Verbose) {
            args.push("--debug".to_string());
        }
        if request.has_flag(AgentFlag::ContinueConversation) {
            debug!("gemini cannot continue a conversation; flag ignored");
        }
        if request.mcp_config.is_some() {
            debug!("gemini reads MCP servers from its settings file; mcp_config ignored");
        }

        if !request.allowed_tools.is_empty() {
            args.push("--allowed-tools".to_string());
            args.push(request.allowed_tools.join(","));
        }

        if !request.context_paths.is_empty() {
            let dirs: Vec<String> = request
                .context_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            args.push("--include-directories".to_string());
            args.push(dirs.join(","));
        }

        args
    }

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

#[async_trait]
impl AgentInvoker for GeminiCli {
    fn name(&self) -> &str {
        self.settings.name()
    }

    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse> {
        let spec = self.command(request);
        debug!(
            program = %spec.program,
            files = request.file_paths.len(),
            "Invoking gemini"
        );
        run_agent(&spec, self.settings.output_format).await
    }
}
