//! External agent invocation for Repository Manager
//!
//! This crate drives AI command-line tools as subprocesses. It provides:
//!
//! - [`AgentRequest`] / [`AgentResponse`], the request and parsed reply
//! - The [`AgentInvoker`] capability and its two CLI adapters,
//!   [`ClaudeCli`] and [`GeminiCli`]
//! - [`AgentManager`], which probes the configured binaries and reports
//!   their health
//!
//! Every failure an adapter can produce is an [`AgentError`] variant, and
//! every variant reports its retry classification through
//! [`repo_retry::Classify`].

pub mod claude;
pub mod discovery;
pub mod error;
pub mod gemini;
pub mod invoker;
pub mod settings;
pub mod subprocess;
pub mod types;

pub use claude::ClaudeCli;
pub use discovery::AgentManager;
pub use error::{AgentError, Result};
pub use gemini::GeminiCli;
pub use invoker::AgentInvoker;
pub use settings::{AgentKind, AgentSettings};
pub use types::{AgentFlag, AgentInfo, AgentRequest, AgentResponse, HealthReport, OutputFormat};
