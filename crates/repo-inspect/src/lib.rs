//! Local repository inspection.
//!
//! [`analyze`] walks a checkout and produces a [`StructuredReport`] that the
//! workflow layer attaches to agent prompts as repository context.
//! [`validate_project_brief`] checks a `PROJECT_BRIEF.md` before a project
//! is started from it.

pub mod analyzer;
pub mod brief;
pub mod error;

pub use analyzer::{
    CiCd, CodePatterns, DirectoryStructure, Documentation, ExtensionCount, FileTypes,
    StructuredReport, TechnologyStack, Testing, analyze,
};
pub use brief::{BriefValidation, validate_brief_content, validate_project_brief};
pub use error::{InspectError, Result};
