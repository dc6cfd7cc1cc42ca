//! Agent discovery: probe the configured agent binaries
//!
//! Each binary is run with `--version`. Discovery never fails; a missing or
//! broken binary is reported as unavailable in the [`HealthReport`].

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::settings::AgentSettings;
use crate::types::{AgentInfo, HealthReport};

/// How long a `--version` probe may take
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Agent manager: knows which configured agents are usable
#[derive(Debug, Clone)]
pub struct AgentManager {
    agents: Vec<AgentInfo>,
}

impl AgentManager {
    /// Probe every configured agent, concurrently.
    ///
    /// Agents are named by [`AgentSettings::name`]. When two settings share a
    /// name, the later one is named by its program instead.
    pub async fn discover(settings: &[AgentSettings]) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(settings.len());
        for s in settings {
            let name = if names.iter().any(|n| n == s.name()) {
                s.program().to_string()
            } else {
                s.name().to_string()
            };
            names.push(name);
        }

        let probes = settings.iter().zip(names).map(|(s, name)| async move {
            let program = s.program().to_string();
            let version = probe_version(&program).await;
            AgentInfo {
                name,
                available: version.is_some(),
                program,
                version,
            }
        });
        let agents = futures::future::join_all(probes).await;
        Self { agents }
    }

    /// Build a manager from already-known agent info
    pub fn from_agents(agents: Vec<AgentInfo>) -> Self {
        Self { agents }
    }

    /// True only if at least one agent is configured and all are available
    pub fn is_available(&self) -> bool {
        !self.agents.is_empty() && self.agents.iter().all(|a| a.available)
    }

    pub fn agents(&self) -> &[AgentInfo] {
        &self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&AgentInfo> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Summarize availability with one message per agent
    pub fn health_check(&self) -> HealthReport {
        if self.agents.is_empty() {
            return HealthReport::unavailable(vec!["No agents configured".to_string()]);
        }

        let messages = self
            .agents
            .iter()
            .map(|a| match &a.version {
                Some(version) => format!("{} found: {} ({})", a.name, a.program, version),
                None => format!(
                    "{} not found. Install it or set `program` for this agent.",
                    a.program
                ),
            })
            .collect();

        HealthReport {
            available: self.is_available(),
            agents: self.agents.clone(),
            messages,
        }
    }
}

/// Run `<program> --version` and return the first non-empty output line
pub async fn probe_version(program: &str) -> Option<String> {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!(program, error = %e, "Agent probe failed to start");
            return None;
        }
        Err(_) => {
            debug!(program, "Agent probe timed out");
            return None;
        }
    };

    if !output.status.success() {
        debug!(program, code = ?output.status.code(), "Agent probe exited non-zero");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown")
        .to_string();
    Some(version)
}
