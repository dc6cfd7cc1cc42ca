//! Workflow configuration files.
//!
//! The format is picked from the file extension: `.toml`, `.json`, `.yaml`
//! or `.yml`. Every section is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use repo_agent::AgentSettings;
use repo_retry::{RetryConfig, RetrySettings};

use crate::batch::BatchOptions;
use crate::error::{Error, Result};
use crate::task::{AgentRole, TaskRouting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

/// Retry policy per agent slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicies {
    pub primary: RetrySettings,
    pub reviewer: RetrySettings,
}

impl RetryPolicies {
    pub fn for_role(&self, role: AgentRole) -> &RetrySettings {
        match role {
            AgentRole::Primary => &self.primary,
            AgentRole::Reviewer => &self.reviewer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Agent A
    #[serde(default = "AgentSettings::claude")]
    pub primary: AgentSettings,
    /// Agent B
    #[serde(default = "AgentSettings::gemini")]
    pub reviewer: AgentSettings,
    #[serde(default)]
    pub retry: RetryPolicies,
    #[serde(default)]
    pub batch: BatchOptions,
    #[serde(default)]
    pub routing: TaskRouting,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            primary: AgentSettings::claude(),
            reviewer: AgentSettings::gemini(),
            retry: RetryPolicies::default(),
            batch: BatchOptions::default(),
            routing: TaskRouting::default(),
        }
    }
}

impl WorkflowConfig {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, format).map_err(|e| match e {
            Error::ConfigParse { format, message, .. } => Error::ConfigParse {
                path: path.to_path_buf(),
                format,
                message,
            },
            other => other,
        })?;
        debug!(path = %path.display(), "workflow configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let parse_error = |message: String| Error::ConfigParse {
            path: Default::default(),
            format: format.name().to_string(),
            message,
        };
        let config: Self = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every section, reporting the first problem
    pub fn validate(&self) -> Result<()> {
        self.retry_config(AgentRole::Primary)?;
        self.retry_config(AgentRole::Reviewer)?;
        if self.batch.concurrency == 0 {
            return Err(Error::invalid_config("batch", "concurrency must be at least 1"));
        }
        for (section, settings) in [("primary", &self.primary), ("reviewer", &self.reviewer)] {
            if settings.timeout_secs == Some(0) {
                return Err(Error::invalid_config(section, "timeout_secs must be at least 1"));
            }
        }
        Ok(())
    }

    pub fn agent(&self, role: AgentRole) -> &AgentSettings {
        match role {
            AgentRole::Primary => &self.primary,
            AgentRole::Reviewer => &self.reviewer,
        }
    }

    /// The executor policy for `role`
    pub fn retry_config(&self, role: AgentRole) -> Result<RetryConfig> {
        self.retry
            .for_role(role)
            .to_config()
            .map_err(|e| Error::invalid_config(format!("retry.{role}"), e))
    }
}
