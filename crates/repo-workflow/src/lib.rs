//! Multi-agent repository workflows.
//!
//! A [`WorkflowOrchestrator`] drives two agents through a fixed set of
//! [`Task`]s: issue analysis, fix proposal, fix validation, code review,
//! documentation and PR descriptions. Each task is exactly one agent call
//! governed by a [`repo_retry::RetryExecutor`].
//!
//! ```rust,no_run
//! use repo_workflow::{IssueRun, WorkflowConfig, WorkflowOrchestrator};
//!
//! # async fn run() -> repo_workflow::Result<()> {
//! let config = WorkflowConfig::load("workflow.toml".as_ref())?;
//! let orchestrator = WorkflowOrchestrator::from_config(&config)?;
//! let report = orchestrator
//!     .resolve_issue(&IssueRun::new(42, "Login fails for users with unicode passwords"))
//!     .await?;
//! println!("{}", report.pr_description().map(|r| r.content()).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod run;
pub mod task;

pub use batch::{BatchItem, BatchMode, BatchOptions, BatchOutcome, BatchReport};
pub use config::{ConfigFormat, RetryPolicies, WorkflowConfig};
pub use context::WorkflowContext;
pub use error::{Error, Result};
pub use orchestrator::WorkflowOrchestrator;
pub use run::{IssueRun, WorkflowReport};
pub use task::{AgentRole, Task, TaskRouting};
