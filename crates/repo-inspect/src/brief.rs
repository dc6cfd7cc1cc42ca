//! `PROJECT_BRIEF.md` validation.
//!
//! A brief is a markdown document split into `## ` sections. Four of them
//! are required, each recognized under a few heading variations and each
//! with a minimum amount of content. Headings are matched case-insensitively
//! by containment so decorated headings such as `## 🎯 Project Overview`
//! are accepted.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

struct RequiredSection {
    name: &'static str,
    variations: &'static [&'static str],
    min_length: usize,
}

const REQUIRED_SECTIONS: &[RequiredSection] = &[
    RequiredSection {
        name: "Project Overview",
        variations: &["project overview", "overview"],
        min_length: 50,
    },
    RequiredSection {
        name: "Core Requirements",
        variations: &["core requirements", "core features", "functional requirements"],
        min_length: 50,
    },
    RequiredSection {
        name: "Technical Preferences",
        variations: &["technical preferences", "technical requirements", "tech stack"],
        min_length: 15,
    },
    RequiredSection {
        name: "Success Criteria",
        variations: &[
            "success criteria",
            "success metrics",
            "acceptance criteria",
            "completion checklist",
        ],
        min_length: 10,
    },
];

/// Overview fields: the first is required, the rest only warn when absent
const OVERVIEW_FIELDS: &[&str] = &[
    "Project Name",
    "Brief Description",
    "Problem Statement",
    "Target Users",
];
const SHORT_FIELD: usize = 10;
const MIN_REQUIREMENT_ITEMS: usize = 3;

static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*\*([^*]+)\*\*\s*:\s*(.*)$").expect("field pattern is valid")
});
static UNCHECKED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+\[ \]").expect("checkbox pattern is valid"));
static LIST_ITEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-*]|\d+\.)\s+\S").expect("list item pattern is valid"));
static RULE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(-{3,}|\*{3,}|_{3,})\s*$").expect("rule pattern is valid"));

/// Outcome of validating a brief.
///
/// Errors make the brief invalid; warnings are advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BriefValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BriefValidation {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BriefValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            write!(f, "Project brief is valid")?;
        } else {
            write!(f, "Project brief is invalid ({} errors)", self.errors.len())?;
        }
        for error in &self.errors {
            write!(f, "\n  error: {error}")?;
        }
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}

/// Validate the brief at `path`.
///
/// I/O problems are reported as validation errors rather than returned,
/// so callers always get a [`BriefValidation`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn validate_project_brief(path: &Path) -> BriefValidation {
    if !path.is_file() {
        return BriefValidation::from_findings(
            vec![format!("Project brief not found: {}", path.display())],
            Vec::new(),
        );
    }
    match std::fs::read_to_string(path) {
        Ok(content) => validate_brief_content(&content),
        Err(e) => BriefValidation::from_findings(
            vec![format!("Could not read {}: {e}", path.display())],
            Vec::new(),
        ),
    }
}

/// Validate brief markdown already in memory
pub fn validate_brief_content(content: &str) -> BriefValidation {
    let sections = split_sections(content);
    debug!(sections = sections.len(), "brief parsed");

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for required in REQUIRED_SECTIONS {
        let Some(section) = find_section(&sections, required) else {
            errors.push(format!("Missing required section: {}", required.name));
            continue;
        };
        let length = section.body.chars().count();
        if length < required.min_length {
            errors.push(format!(
                "Section '{}' is too short ({length} characters, minimum {})",
                required.name, required.min_length
            ));
        }
    }

    if let Some(overview) = find_section(&sections, &REQUIRED_SECTIONS[0]) {
        check_overview_fields(&overview.body, &mut errors, &mut warnings);
    }
    if let Some(requirements) = find_section(&sections, &REQUIRED_SECTIONS[1]) {
        let items = requirements
            .body
            .lines()
            .filter(|line| LIST_ITEM_PATTERN.is_match(line))
            .count();
        if items < MIN_REQUIREMENT_ITEMS {
            warnings.push(format!(
                "Core Requirements lists only {items} items, consider at least {MIN_REQUIREMENT_ITEMS}"
            ));
        }
    }

    let unchecked = content
        .lines()
        .filter(|line| UNCHECKED_PATTERN.is_match(line))
        .count();
    if unchecked > 0 {
        warnings.push(format!("{unchecked} checklist items are not checked"));
    }

    BriefValidation::from_findings(errors, warnings)
}

#[derive(Debug)]
struct Section {
    heading: String,
    body: String,
}

/// Split on `## ` headings. Horizontal rules are dropped from bodies and
/// bodies are trimmed.
fn split_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some((heading, body)) = current.take() {
                sections.push(finish_section(heading, &body));
            }
            current = Some((heading.trim().to_lowercase(), Vec::new()));
        } else if line.starts_with("# ") {
            if let Some((heading, body)) = current.take() {
                sections.push(finish_section(heading, &body));
            }
        } else if let Some((_, body)) = current.as_mut() {
            if !RULE_PATTERN.is_match(line) {
                body.push(line);
            }
        }
    }
    if let Some((heading, body)) = current {
        sections.push(finish_section(heading, &body));
    }
    sections
}

fn finish_section(heading: String, body: &[&str]) -> Section {
    Section {
        heading,
        body: body.join("\n").trim().to_string(),
    }
}

fn find_section<'a>(sections: &'a [Section], required: &RequiredSection) -> Option<&'a Section> {
    // Variations are ordered most specific first
    required.variations.iter().find_map(|variation| {
        sections
            .iter()
            .find(|section| section.heading.contains(variation))
    })
}

fn check_overview_fields(body: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let fields = overview_fields(body);

    for (index, name) in OVERVIEW_FIELDS.iter().enumerate() {
        let value = fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str());
        match value {
            None | Some("") if index == 0 => errors.push(format!("Missing required field: {name}")),
            None | Some("") => warnings.push(format!("Missing recommended field: {name}")),
            Some(value) if value.chars().count() < SHORT_FIELD => {
                warnings.push(format!("Field '{name}' is very short"));
            }
            Some(_) => {}
        }
    }
}

/// `**Field**: value` pairs. A value may also start on the next non-blank
/// line when the field line itself ends after the colon.
fn overview_fields(body: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = body.lines().collect();
    let mut fields = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(captures) = FIELD_PATTERN.captures(line) else {
            continue;
        };
        let name = captures[1].trim().to_string();
        let mut value = captures[2].trim().to_string();
        if value.is_empty() {
            value = lines[index + 1..]
                .iter()
                .map(|l| l.trim())
                .find(|l| !l.is_empty())
                .filter(|l| !FIELD_PATTERN.is_match(l))
                .unwrap_or_default()
                .to_string();
        }
        fields.push((name, value));
    }
    fields
}
