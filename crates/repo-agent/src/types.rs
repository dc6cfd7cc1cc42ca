//! Shared types for agent operations

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Payload fields that carry an agent's answer, in lookup order
pub const CONTENT_FIELDS: &[&str] = &["response", "content", "result"];

/// Mode and permission options for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFlag {
    /// Apply file edits without asking
    AcceptEdits,
    /// Approve every tool call without asking
    AutoApprove,
    /// Plan only, make no changes. Takes precedence over the other permission flags.
    PlanOnly,
    /// Continue the most recent conversation
    ContinueConversation,
    /// Ask the agent for verbose or debug output
    Verbose,
}

/// How the agent is asked to format stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

/// A single request to an agent.
///
/// Invokers only ever see `&AgentRequest`; once submitted a request cannot
/// change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentRequest {
    pub prompt: String,
    /// Files the prompt is about, referenced as `@path` in the prompt text
    pub file_paths: Vec<PathBuf>,
    pub system_prompt: Option<String>,
    pub flags: BTreeSet<AgentFlag>,
    /// Extra directories the agent may read
    pub context_paths: Vec<PathBuf>,
    /// Overrides the invoker's configured model
    pub model: Option<String>,
    /// Restrict the agent to these tools; empty means no restriction
    pub allowed_tools: Vec<String>,
    /// Text written to the process's stdin
    pub stdin: Option<String>,
    pub mcp_config: Option<PathBuf>,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_paths.push(path.into());
        self
    }

    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.file_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_flag(mut self, flag: AgentFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_context_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.context_paths.push(path.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn with_mcp_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.mcp_config = Some(path.into());
        self
    }

    pub fn has_flag(&self, flag: AgentFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// The prompt followed by one `@path` reference per file
    pub fn prompt_with_file_refs(&self) -> String {
        if self.file_paths.is_empty() {
            return self.prompt.clone();
        }
        let refs: Vec<String> = self
            .file_paths
            .iter()
            .map(|p| format!("@{}", p.display()))
            .collect();
        format!("{}\n\n{}", self.prompt, refs.join(" "))
    }

    /// Display form of the first file, if any
    pub fn primary_file(&self) -> Option<&Path> {
        self.file_paths.first().map(PathBuf::as_path)
    }
}

/// Parsed reply from an agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    payload: Map<String, Value>,
    raw_exit_code: i32,
}

impl AgentResponse {
    /// Wrap a parsed JSON object.
    ///
    /// Fails with [`AgentError::MalformedResponse`] unless the payload has one
    /// of the [`CONTENT_FIELDS`].
    pub fn from_payload(
        program: &str,
        payload: Map<String, Value>,
        raw_exit_code: i32,
    ) -> Result<Self> {
        if !CONTENT_FIELDS.iter().any(|f| payload.contains_key(*f)) {
            let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
            return Err(AgentError::malformed(
                program,
                format!(
                    "expected one of {:?}, found keys {:?}",
                    CONTENT_FIELDS, keys
                ),
            ));
        }
        Ok(Self {
            payload,
            raw_exit_code,
        })
    }

    /// Wrap any JSON value; only objects are accepted
    pub fn from_value(program: &str, value: Value, raw_exit_code: i32) -> Result<Self> {
        match value {
            Value::Object(payload) => Self::from_payload(program, payload, raw_exit_code),
            other => Err(AgentError::malformed(
                program,
                format!("expected a JSON object, got {}", json_type(&other)),
            )),
        }
    }

    /// Plain-text output, stored as `{"content": text}`
    pub fn from_text(text: impl Into<String>, raw_exit_code: i32) -> Self {
        let mut payload = Map::new();
        payload.insert("content".to_string(), Value::String(text.into()));
        Self {
            payload,
            raw_exit_code,
        }
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }

    pub fn raw_exit_code(&self) -> i32 {
        self.raw_exit_code
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Name and value of the field carrying the answer
    pub fn content_field(&self) -> Option<(&'static str, &Value)> {
        CONTENT_FIELDS
            .iter()
            .find_map(|f| self.payload.get(*f).map(|v| (*f, v)))
    }

    /// The answer as text. Non-string values are rendered as JSON.
    pub fn content(&self) -> Cow<'_, str> {
        match self.content_field() {
            Some((_, Value::String(s))) => Cow::Borrowed(s.as_str()),
            Some((_, other)) => Cow::Owned(other.to_string()),
            None => Cow::Borrowed(""),
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.payload.get("model").and_then(Value::as_str)
    }

    /// Deserialize the answer as structured data.
    ///
    /// A string answer is parsed as JSON after stripping a surrounding
    /// Markdown code fence; an object answer is deserialized directly.
    pub fn parse_body<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match self.content_field() {
            Some((_, Value::String(s))) => serde_json::from_str(strip_code_fence(s)),
            Some((_, other)) => T::deserialize(other),
            None => serde_json::from_str(""),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Availability of one configured agent binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Agent name (e.g., "claude", "gemini")
    pub name: String,
    /// Program that was probed
    pub program: String,
    /// First line of `--version` output, if the probe succeeded
    pub version: Option<String>,
    /// Whether the binary answered the probe
    pub available: bool,
}

/// Health report for the configured agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Whether every configured agent is available
    pub available: bool,
    pub agents: Vec<AgentInfo>,
    /// Human-readable status messages
    pub messages: Vec<String>,
}

impl HealthReport {
    /// Create a report indicating no agent is usable
    pub fn unavailable(messages: Vec<String>) -> Self {
        Self {
            available: false,
            agents: Vec::new(),
            messages,
        }
    }
}
