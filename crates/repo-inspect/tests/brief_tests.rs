//! Project brief validation against realistic briefs

use repo_inspect::{validate_brief_content, validate_project_brief};
use repo_test_utils::TestRepo;
use rstest::rstest;

const OVERVIEW: &str = "## Project Overview

**Project Name**: Test Project

**Brief Description**: This is a test project with a sufficiently long description to pass validation.

**Problem Statement**: This is a problem statement that is long enough to meet the minimum length requirement for validation purposes.

**Target Users**: Developers and testers

---
";

const REQUIREMENTS: &str = "## Core Requirements

### Functional Requirements
1. Feature one
2. Feature two
3. Feature three

---
";

const TECHNICAL: &str = "## Technical Preferences

- Python
- Django
- PostgreSQL

---
";

const SUCCESS: &str = "## Success Criteria

1. Achieve 90% code coverage with automated tests
2. Deploy to production within 1 hour of commit

---
";

fn brief(sections: &[&str]) -> String {
    format!("# Project Brief\n\n{}", sections.join("\n"))
}

const DECORATED_BRIEF: &str = "# Project Brief

## 🎯 Project Overview

**Project Name**: Test Project

**Brief Description**:
A test project for validation

**Problem Statement**:
Testing the validation workflow

**Target Users**:
Developers and testers

---

## 📋 Core Requirements

### Functional Requirements
1. User authentication
2. Data management

### Non-Functional Requirements
- **Performance**: Fast response times

## 🏗️ Technical Preferences

### Technology Stack
**Backend**: Python

## 👥 User Roles & Permissions

| Role | Description |
|------|-------------|
| User | Standard user |

## ✅ Completion Checklist

- [x] All sections complete
- [x] Ready for development
";

#[test]
fn test_complete_brief_is_valid() {
    let result = validate_brief_content(&brief(&[OVERVIEW, REQUIREMENTS, TECHNICAL, SUCCESS]));
    assert!(result.is_valid, "{}", result.summary());
    assert!(result.errors.is_empty());
}

#[test]
fn test_missing_success_criteria() {
    let result = validate_brief_content(&brief(&[OVERVIEW, REQUIREMENTS, TECHNICAL]));

    assert!(!result.is_valid);
    assert!(result.errors.iter().any(|e| e.contains("Success Criteria")));
}

#[test]
fn test_empty_success_criteria_is_too_short() {
    let result = validate_brief_content(&brief(&[
        OVERVIEW,
        REQUIREMENTS,
        TECHNICAL,
        "## Success Criteria\n\n---\n",
    ]));

    assert!(!result.is_valid);
    assert!(result.errors.iter().any(|e| e.to_lowercase().contains("too short")));
}

#[test]
fn test_section_variations_are_accepted() {
    let content = brief(&[
        &OVERVIEW.replace("## Project Overview", "## Overview"),
        &REQUIREMENTS.replace("## Core Requirements", "## Core Features"),
        &TECHNICAL.replace("## Technical Preferences", "## Technical Requirements"),
        SUCCESS,
    ]);
    let result = validate_brief_content(&content);
    assert!(result.is_valid, "{}", result.summary());
}

#[test]
fn test_decorated_headings_and_checklist() {
    let result = validate_brief_content(DECORATED_BRIEF);
    assert!(result.is_valid, "{}", result.summary());
}

#[rstest]
#[case::missing_requirements(&[OVERVIEW, TECHNICAL, SUCCESS], "Missing required section: Core Requirements")]
#[case::missing_technical(&[OVERVIEW, REQUIREMENTS, SUCCESS], "Missing required section: Technical Preferences")]
#[case::missing_overview(&[REQUIREMENTS, TECHNICAL, SUCCESS], "Missing required section: Project Overview")]
fn test_each_section_is_required(#[case] sections: &[&str], #[case] expected: &str) {
    let result = validate_brief_content(&brief(sections));
    assert!(!result.is_valid);
    assert!(
        result.errors.iter().any(|e| e == expected),
        "expected {expected:?} in {:?}",
        result.errors
    );
}

#[test]
fn test_invalid_brief_reports_every_missing_section() {
    let result = validate_brief_content(
        "# Project Brief\n\n## 🎯 Project Overview\n\n**Project Name**: Invalid Project\n\nThis is missing many required sections.\n",
    );

    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
}

#[test]
fn test_short_fields_only_warn() {
    let content = brief(&[
        &OVERVIEW.replace(
            "**Target Users**: Developers and testers",
            "**Target Users**: Devs",
        ),
        REQUIREMENTS,
        TECHNICAL,
        SUCCESS,
    ]);
    let result = validate_brief_content(&content);

    assert!(result.is_valid);
    assert!(
        result
            .warnings
            .contains(&"Field 'Target Users' is very short".to_string())
    );
}

#[test]
fn test_brief_file_on_disk() {
    let repo = TestRepo::new();
    let path = repo.write(
        "PROJECT_BRIEF.md",
        &brief(&[OVERVIEW, REQUIREMENTS, TECHNICAL, SUCCESS]),
    );

    assert!(validate_project_brief(&path).is_valid);
}

#[test]
fn test_missing_file() {
    let repo = TestRepo::new();
    let result = validate_project_brief(&repo.path("PROJECT_BRIEF.md"));

    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not found"));
}
