//! Results shared between the tasks of one workflow run

use serde::Serialize;

use repo_agent::AgentResponse;

use crate::task::Task;

/// Ordered `(task, response)` pairs accumulated by the caller during a run.
///
/// The orchestrator's task operations never touch a context. Callers record
/// results and feed them into later requests themselves. Nothing here is
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowContext {
    entries: Vec<(Task, AgentResponse)>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, task: Task, response: AgentResponse) {
        self.entries.push((task, response));
    }

    pub fn entries(&self) -> &[(Task, AgentResponse)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(Task, AgentResponse)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent result for `task`
    pub fn latest(&self, task: Task) -> Option<&AgentResponse> {
        self.entries
            .iter()
            .rev()
            .find(|(t, _)| *t == task)
            .map(|(_, response)| response)
    }

    /// Tasks in the order they were recorded
    pub fn tasks(&self) -> Vec<Task> {
        self.entries.iter().map(|(task, _)| *task).collect()
    }

    /// Earlier results rendered as prompt text, one section per entry
    pub fn as_prompt_context(&self) -> String {
        self.entries
            .iter()
            .map(|(task, response)| format!("## {task}\n{}", response.content().trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
