//! The issue-resolution workflow run

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use repo_agent::AgentResponse;
use repo_inspect::validate_project_brief;

use crate::batch::BatchReport;
use crate::context::WorkflowContext;
use crate::error::{Error, Result};
use crate::orchestrator::WorkflowOrchestrator;
use crate::task::Task;

/// Input for [`WorkflowOrchestrator::resolve_issue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRun {
    pub issue_number: u64,
    pub issue_body: String,
    /// An already written fix. When absent the primary agent proposes one.
    pub fix_description: Option<String>,
    /// Files touched by the fix, each reviewed separately
    pub changed_files: Vec<PathBuf>,
    /// Checked before any agent is called
    pub brief: Option<PathBuf>,
}

impl IssueRun {
    pub fn new(issue_number: u64, issue_body: impl Into<String>) -> Self {
        Self {
            issue_number,
            issue_body: issue_body.into(),
            fix_description: None,
            changed_files: Vec::new(),
            brief: None,
        }
    }

    pub fn with_fix(mut self, fix_description: impl Into<String>) -> Self {
        self.fix_description = Some(fix_description.into());
        self
    }

    pub fn with_changed_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.changed_files.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_brief(mut self, path: impl Into<PathBuf>) -> Self {
        self.brief = Some(path.into());
        self
    }
}

/// Everything one run produced
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub run_id: Uuid,
    pub issue_number: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every task result in the order it was produced
    pub context: WorkflowContext,
    /// The analysis as structured data, when the agent answered in JSON
    pub analysis: Option<Value>,
    pub reviews: BatchReport,
}

impl WorkflowReport {
    pub fn analysis(&self) -> Option<&AgentResponse> {
        self.context.latest(Task::AnalyzeIssue)
    }

    pub fn validation(&self) -> Option<&AgentResponse> {
        self.context.latest(Task::ValidateFix)
    }

    pub fn pr_description(&self) -> Option<&AgentResponse> {
        self.context.latest(Task::GeneratePrDescription)
    }

    /// True when every changed file was reviewed
    pub fn is_complete(&self) -> bool {
        self.reviews.is_complete()
    }
}

impl WorkflowOrchestrator {
    /// Analyze, fix, validate, review and describe one issue.
    ///
    /// A failing review of one file is recorded as a gap in
    /// [`WorkflowReport::reviews`]; any other task failure ends the run.
    #[instrument(skip_all, fields(issue = run.issue_number))]
    pub async fn resolve_issue(&self, run: &IssueRun) -> Result<WorkflowReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, files = run.changed_files.len(), "workflow run started");

        if let Some(brief) = &run.brief {
            let validation = validate_project_brief(brief);
            for warning in &validation.warnings {
                warn!(brief = %brief.display(), "{warning}");
            }
            if !validation.is_valid {
                return Err(Error::InvalidBrief {
                    errors: validation.errors,
                });
            }
        }

        let mut context = WorkflowContext::new();

        let analysis = self.analyze_issue(&run.issue_body).await?;
        let structured = analysis.parse_body::<Value>().ok();
        let analysis_text = analysis.content().into_owned();
        context.record(Task::AnalyzeIssue, analysis);

        let fix = match &run.fix_description {
            Some(fix) => fix.clone(),
            None => {
                let proposal = self.propose_fix(&run.issue_body, &analysis_text).await?;
                let text = proposal.content().into_owned();
                context.record(Task::ProposeFix, proposal);
                text
            }
        };

        let validation = self.validate_fix(&run.issue_body, &fix).await?;
        context.record(Task::ValidateFix, validation);

        let reviews = self.review_batch(run.changed_files.clone()).await?;
        for (_, response) in reviews.completed() {
            context.record(Task::ReviewCodeChanges, response.clone());
        }
        let gaps = reviews.gaps().count();
        if gaps > 0 {
            warn!(gaps, "some files could not be reviewed");
        }

        let summary = change_summary(&fix, &run.changed_files, &reviews);
        let description = self
            .generate_pr_description(&summary, run.issue_number)
            .await?;
        context.record(Task::GeneratePrDescription, description);

        let finished_at = Utc::now();
        info!(%run_id, tasks = context.len(), gaps, "workflow run finished");

        Ok(WorkflowReport {
            run_id,
            issue_number: run.issue_number,
            started_at,
            finished_at,
            context,
            analysis: structured,
            reviews,
        })
    }
}

fn change_summary(fix: &str, files: &[PathBuf], reviews: &BatchReport) -> String {
    let mut summary = fix.trim().to_string();
    if !files.is_empty() {
        let listed: Vec<String> = files.iter().map(|p| format!("- {}", p.display())).collect();
        summary.push_str(&format!("\n\nFiles changed:\n{}", listed.join("\n")));
    }
    for (path, review) in reviews.completed() {
        summary.push_str(&format!(
            "\n\nReview of {}:\n{}",
            path.display(),
            review.content().trim()
        ));
    }
    for (path, failure) in reviews.gaps() {
        summary.push_str(&format!(
            "\n\nReview of {} unavailable: {}",
            path.display(),
            failure.message
        ));
    }
    summary
}
