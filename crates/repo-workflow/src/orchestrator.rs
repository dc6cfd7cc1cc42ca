//! [`WorkflowOrchestrator`]: one retry-governed agent call per task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use repo_agent::{AgentFlag, AgentInvoker, AgentRequest, AgentResponse};
use repo_inspect::StructuredReport;
use repo_retry::{
    BackoffPolicy, CancellationToken, FailureRecord, RetryConfig, RetryError, RetryExecutor,
    RetryObserver, TracingObserver,
};

use crate::batch::{BatchItem, BatchMode, BatchOptions, BatchOutcome, BatchReport};
use crate::config::WorkflowConfig;
use crate::error::{Error, Result};
use crate::prompts;
use crate::task::{AgentRole, Task, TaskRouting};

struct AgentSlot {
    agent: Arc<dyn AgentInvoker>,
    retry: RetryConfig,
}

/// Runs workflow tasks against two agents.
///
/// Every task builds a fresh [`AgentRequest`], hands it to the agent the
/// [`TaskRouting`] table names, and lets a [`RetryExecutor`] govern the
/// call. Tasks keep no state between calls; chaining results is the
/// caller's job (see [`WorkflowContext`](crate::WorkflowContext)).
pub struct WorkflowOrchestrator {
    primary: AgentSlot,
    reviewer: AgentSlot,
    routing: TaskRouting,
    batch: BatchOptions,
    backoff: BackoffPolicy,
    observer: Option<Arc<dyn RetryObserver>>,
    cancel: CancellationToken,
    repository_summary: Option<String>,
    repository_root: Option<PathBuf>,
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("primary", &self.primary.agent.name())
            .field("reviewer", &self.reviewer.agent.name())
            .field("routing", &self.routing)
            .field("batch", &self.batch)
            .field("repository_root", &self.repository_root)
            .finish_non_exhaustive()
    }
}

impl WorkflowOrchestrator {
    /// Both agents use [`RetryConfig::agent_default`]
    pub fn new(primary: Arc<dyn AgentInvoker>, reviewer: Arc<dyn AgentInvoker>) -> Self {
        Self {
            primary: AgentSlot {
                agent: primary,
                retry: RetryConfig::agent_default(),
            },
            reviewer: AgentSlot {
                agent: reviewer,
                retry: RetryConfig::agent_default(),
            },
            routing: TaskRouting::default(),
            batch: BatchOptions::default(),
            backoff: BackoffPolicy::default(),
            observer: None,
            cancel: CancellationToken::new(),
            repository_summary: None,
            repository_root: None,
        }
    }

    /// Build both agents and their retry policies from configuration
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.primary.build(), config.reviewer.build())
            .with_retry(AgentRole::Primary, config.retry_config(AgentRole::Primary)?)
            .with_retry(AgentRole::Reviewer, config.retry_config(AgentRole::Reviewer)?)
            .with_routing(config.routing.clone())
            .with_batch_options(config.batch))
    }

    pub fn with_retry(mut self, role: AgentRole, retry: RetryConfig) -> Self {
        self.slot_mut(role).retry = retry;
        self
    }

    pub fn with_routing(mut self, routing: TaskRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Options used by [`resolve_issue`](Self::resolve_issue) for its review
    /// batch. The mode is always continue-on-error there.
    pub fn with_batch_options(mut self, batch: BatchOptions) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Report retry events of both agents to `observer` instead of tracing
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Attach an analyzed repository: its summary goes into every system
    /// prompt and its root is offered to the agents as a readable directory.
    pub fn with_repository_context(mut self, report: &StructuredReport) -> Self {
        self.repository_summary = Some(report.summary());
        self.repository_root = Some(report.root.clone());
        self
    }

    /// Token that cancels every pending task of this orchestrator
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn routing(&self) -> &TaskRouting {
        &self.routing
    }

    pub fn batch_options(&self) -> BatchOptions {
        self.batch
    }

    pub fn agent(&self, role: AgentRole) -> &Arc<dyn AgentInvoker> {
        &self.slot(role).agent
    }

    /// Agent B works out what an issue needs
    pub async fn analyze_issue(&self, issue_body: &str) -> Result<AgentResponse> {
        let request = self
            .request(Task::AnalyzeIssue, prompts::analyze_issue(issue_body))
            .with_flag(AgentFlag::PlanOnly);
        self.run_task(Task::AnalyzeIssue, &request).await
    }

    /// Agent A proposes a fix, guided by an earlier analysis
    pub async fn propose_fix(&self, issue_body: &str, analysis: &str) -> Result<AgentResponse> {
        let request = self.request(Task::ProposeFix, prompts::propose_fix(issue_body, analysis));
        self.run_task(Task::ProposeFix, &request).await
    }

    pub async fn review_code_changes(&self, file_path: impl AsRef<Path>) -> Result<AgentResponse> {
        let request = self.review_request(file_path.as_ref().to_path_buf());
        self.run_task(Task::ReviewCodeChanges, &request).await
    }

    pub async fn validate_fix(
        &self,
        issue_body: &str,
        fix_description: &str,
    ) -> Result<AgentResponse> {
        let request = self
            .request(Task::ValidateFix, prompts::validate_fix(issue_body, fix_description))
            .with_flag(AgentFlag::PlanOnly);
        self.run_task(Task::ValidateFix, &request).await
    }

    pub async fn generate_pr_description(
        &self,
        change_summary: &str,
        issue_number: u64,
    ) -> Result<AgentResponse> {
        let request = self.request(
            Task::GeneratePrDescription,
            prompts::pr_description(change_summary, issue_number),
        );
        self.run_task(Task::GeneratePrDescription, &request).await
    }

    pub async fn generate_documentation(
        &self,
        file_path: impl AsRef<Path>,
    ) -> Result<AgentResponse> {
        let request = self
            .request(Task::GenerateDocumentation, prompts::GENERATE_DOCUMENTATION)
            .with_file(file_path.as_ref())
            .with_flag(AgentFlag::PlanOnly);
        self.run_task(Task::GenerateDocumentation, &request).await
    }

    /// Send `prompt` about each file, one call per file, in order.
    ///
    /// Fails with the first item whose call fails; later items are never
    /// started.
    pub async fn batch_process<P: AsRef<Path>>(
        &self,
        file_paths: &[P],
        prompt: &str,
    ) -> Result<Vec<AgentResponse>> {
        let report = self
            .batch_process_with(file_paths, prompt, BatchOptions::fail_fast())
            .await?;
        Ok(report.into_responses())
    }

    /// [`batch_process`](Self::batch_process) with an explicit mode and
    /// concurrency.
    ///
    /// In [`BatchMode::ContinueOnError`] a failed item becomes a
    /// [`FailureRecord`] gap in the report. Cancellation always aborts the
    /// whole batch.
    pub async fn batch_process_with<P: AsRef<Path>>(
        &self,
        file_paths: &[P],
        prompt: &str,
        options: BatchOptions,
    ) -> Result<BatchReport> {
        let paths: Vec<PathBuf> = file_paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        self.run_batch(Task::BatchProcess, paths, options, |path| {
            self.request(Task::BatchProcess, prompt).with_file(path)
        })
        .await
    }

    /// Review every file, recording failed reviews as gaps
    pub(crate) async fn review_batch(&self, paths: Vec<PathBuf>) -> Result<BatchReport> {
        let options = BatchOptions {
            mode: BatchMode::ContinueOnError,
            ..self.batch
        };
        self.run_batch(Task::ReviewCodeChanges, paths, options, |path| {
            self.review_request(path)
        })
        .await
    }

    #[instrument(skip_all, fields(task = %task, items = paths.len(), mode = ?options.mode))]
    async fn run_batch<F>(
        &self,
        task: Task,
        paths: Vec<PathBuf>,
        options: BatchOptions,
        build: F,
    ) -> Result<BatchReport>
    where
        F: Fn(PathBuf) -> AgentRequest,
    {
        let build = &build;
        let mut results = stream::iter(paths)
            .map(|path| async move {
                let request = build(path.clone());
                let outcome = self.run_task(task, &request).await;
                (path, outcome)
            })
            .buffered(options.concurrency.max(1));

        let mut items = Vec::new();
        while let Some((path, outcome)) = results.next().await {
            let source = match outcome {
                Ok(response) => {
                    items.push(BatchItem {
                        path,
                        outcome: BatchOutcome::Completed { response },
                    });
                    continue;
                }
                Err(Error::Agent { source, .. }) => source,
                Err(other) => return Err(other),
            };

            if options.mode == BatchMode::FailFast {
                return Err(Error::BatchItem { task, path, source });
            }
            let failure = FailureRecord::from_failure(&source);
            warn!(
                path = %path.display(),
                kind = ?failure.kind,
                error = %failure.message,
                "batch item failed, continuing"
            );
            items.push(BatchItem {
                path,
                outcome: BatchOutcome::Failed { failure },
            });
        }

        Ok(BatchReport::new(items))
    }

    /// One retry-governed call
    async fn run_task(&self, task: Task, request: &AgentRequest) -> Result<AgentResponse> {
        let role = self.routing.role_for(task);
        let slot = self.slot(role);
        let executor = self.executor(role);
        let agent = &slot.agent;
        info!(task = %task, agent = agent.name(), "running task");

        executor
            .execute(|| agent.invoke(request))
            .await
            .map_err(|e| match e {
                RetryError::Operation(source) => Error::Agent { task, source },
                RetryError::Cancelled => Error::Cancelled { task },
            })
    }

    fn executor(&self, role: AgentRole) -> RetryExecutor {
        let observer = self.observer.clone().unwrap_or_else(|| {
            Arc::new(TracingObserver::new(role.to_string())) as Arc<dyn RetryObserver>
        });
        RetryExecutor::new(self.slot(role).retry.clone())
            .with_backoff(self.backoff.clone())
            .with_observer(observer)
            .with_cancellation(self.cancel.clone())
    }

    fn request(&self, task: Task, prompt: impl Into<String>) -> AgentRequest {
        let system = match self.routing.role_for(task) {
            AgentRole::Primary => prompts::PRIMARY_SYSTEM,
            AgentRole::Reviewer => prompts::REVIEWER_SYSTEM,
        };
        let mut request = AgentRequest::new(prompt).with_system_prompt(prompts::system_prompt(
            system,
            self.repository_summary.as_deref(),
        ));
        if let Some(root) = &self.repository_root {
            request = request.with_context_path(root);
        }
        request
    }

    fn review_request(&self, path: PathBuf) -> AgentRequest {
        self.request(Task::ReviewCodeChanges, prompts::REVIEW_CODE_CHANGES)
            .with_file(path)
            .with_flag(AgentFlag::PlanOnly)
    }

    fn slot(&self, role: AgentRole) -> &AgentSlot {
        match role {
            AgentRole::Primary => &self.primary,
            AgentRole::Reviewer => &self.reviewer,
        }
    }

    fn slot_mut(&mut self, role: AgentRole) -> &mut AgentSlot {
        match role {
            AgentRole::Primary => &mut self.primary,
            AgentRole::Reviewer => &mut self.reviewer,
        }
    }
}
