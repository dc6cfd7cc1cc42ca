//! Per-agent settings as they appear in workflow configuration files

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::claude::ClaudeCli;
use crate::gemini::GeminiCli;
use crate::invoker::AgentInvoker;
use crate::types::OutputFormat;

/// Which CLI an agent slot is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Gemini,
}

impl AgentKind {
    /// Binary name looked up on PATH when no program is configured
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }
}

/// How to launch one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub kind: AgentKind,
    /// Label used in discovery and logs; defaults to the kind's binary name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Executable to run; defaults to the kind's binary name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Kill the process after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables, e.g. API keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl AgentSettings {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            name: None,
            program: None,
            model: None,
            timeout_secs: None,
            output_format: OutputFormat::Json,
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn claude() -> Self {
        Self::new(AgentKind::Claude)
    }

    pub fn gemini() -> Self {
        Self {
            model: Some("gemini-2.5-pro".to_string()),
            ..Self::new(AgentKind::Gemini)
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.kind.default_program())
    }

    pub fn program(&self) -> &str {
        self.program
            .as_deref()
            .unwrap_or_else(|| self.kind.default_program())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Build the invoker for this agent
    pub fn build(&self) -> Arc<dyn AgentInvoker> {
        match self.kind {
            AgentKind::Claude => Arc::new(ClaudeCli::new(self.clone())),
            AgentKind::Gemini => Arc::new(GeminiCli::new(self.clone())),
        }
    }
}
