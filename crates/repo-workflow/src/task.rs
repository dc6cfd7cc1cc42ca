//! Named workflow tasks and which agent serves each one

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a workflow. Each task is a single retry-governed agent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    AnalyzeIssue,
    ProposeFix,
    ValidateFix,
    ReviewCodeChanges,
    GeneratePrDescription,
    GenerateDocumentation,
    BatchProcess,
}

impl Task {
    pub const ALL: [Task; 7] = [
        Task::AnalyzeIssue,
        Task::ProposeFix,
        Task::ValidateFix,
        Task::ReviewCodeChanges,
        Task::GeneratePrDescription,
        Task::GenerateDocumentation,
        Task::BatchProcess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnalyzeIssue => "analyze_issue",
            Self::ProposeFix => "propose_fix",
            Self::ValidateFix => "validate_fix",
            Self::ReviewCodeChanges => "review_code_changes",
            Self::GeneratePrDescription => "generate_pr_description",
            Self::GenerateDocumentation => "generate_documentation",
            Self::BatchProcess => "batch_process",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two agent slots of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Agent A: writes code
    Primary,
    /// Agent B: analyzes, reviews and documents
    Reviewer,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Reviewer => "reviewer",
        })
    }
}

/// Task to agent routing table.
///
/// Everything goes to the reviewer except [`Task::ProposeFix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRouting {
    pub analyze_issue: AgentRole,
    pub propose_fix: AgentRole,
    pub validate_fix: AgentRole,
    pub review_code_changes: AgentRole,
    pub generate_pr_description: AgentRole,
    pub generate_documentation: AgentRole,
    pub batch_process: AgentRole,
}

impl Default for TaskRouting {
    fn default() -> Self {
        Self {
            analyze_issue: AgentRole::Reviewer,
            propose_fix: AgentRole::Primary,
            validate_fix: AgentRole::Reviewer,
            review_code_changes: AgentRole::Reviewer,
            generate_pr_description: AgentRole::Reviewer,
            generate_documentation: AgentRole::Reviewer,
            batch_process: AgentRole::Reviewer,
        }
    }
}

impl TaskRouting {
    pub fn role_for(&self, task: Task) -> AgentRole {
        *self.slot(task)
    }

    /// Send `task` to `role`
    pub fn route(mut self, task: Task, role: AgentRole) -> Self {
        *self.slot_mut(task) = role;
        self
    }

    fn slot(&self, task: Task) -> &AgentRole {
        match task {
            Task::AnalyzeIssue => &self.analyze_issue,
            Task::ProposeFix => &self.propose_fix,
            Task::ValidateFix => &self.validate_fix,
            Task::ReviewCodeChanges => &self.review_code_changes,
            Task::GeneratePrDescription => &self.generate_pr_description,
            Task::GenerateDocumentation => &self.generate_documentation,
            Task::BatchProcess => &self.batch_process,
        }
    }

    fn slot_mut(&mut self, task: Task) -> &mut AgentRole {
        match task {
            Task::AnalyzeIssue => &mut self.analyze_issue,
            Task::ProposeFix => &mut self.propose_fix,
            Task::ValidateFix => &mut self.validate_fix,
            Task::ReviewCodeChanges => &mut self.review_code_changes,
            Task::GeneratePrDescription => &mut self.generate_pr_description,
            Task::GenerateDocumentation => &mut self.generate_documentation,
            Task::BatchProcess => &mut self.batch_process,
        }
    }
}
