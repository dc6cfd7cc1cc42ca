//! Fixed prompt templates, one per task

pub const REVIEWER_SYSTEM: &str =
    "You are a senior engineer reviewing work on this repository. Be concise and concrete.";
pub const PRIMARY_SYSTEM: &str =
    "You are a senior engineer implementing changes in this repository. Keep changes minimal.";

pub fn analyze_issue(issue_body: &str) -> String {
    format!(
        "Analyze the following issue. Respond with JSON containing \"summary\", \
         \"complexity\" (low, medium or high), \"affected_files\" and \"approach\".\n\n\
         Issue:\n{issue_body}"
    )
}

pub fn propose_fix(issue_body: &str, analysis: &str) -> String {
    format!(
        "Propose a fix for the issue below, guided by the analysis. Describe the \
         change file by file.\n\nIssue:\n{issue_body}\n\nAnalysis:\n{analysis}"
    )
}

pub fn validate_fix(issue_body: &str, fix_description: &str) -> String {
    format!(
        "Check whether the fix resolves the issue. Respond with JSON containing \
         \"resolves_issue\" (true or false) and \"concerns\".\n\n\
         Issue:\n{issue_body}\n\nFix:\n{fix_description}"
    )
}

pub const REVIEW_CODE_CHANGES: &str =
    "Review the changes in this file. Report bugs, security problems and style issues.";

pub fn pr_description(change_summary: &str, issue_number: u64) -> String {
    format!(
        "Write a pull request description for the changes below. It must reference \
         issue #{issue_number} with \"Closes #{issue_number}\".\n\nChanges:\n{change_summary}"
    )
}

pub const GENERATE_DOCUMENTATION: &str =
    "Write reference documentation for this file: purpose, public items and usage examples.";

/// `system` followed by the repository summary, when there is one
pub fn system_prompt(system: &str, repository_context: Option<&str>) -> String {
    match repository_context {
        Some(context) => format!("{system}\n\nRepository context:\n{context}"),
        None => system.to_string(),
    }
}
