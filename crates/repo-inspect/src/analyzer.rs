//! Structural analysis of a local repository.
//!
//! The analyzer makes a single bounded walk of the checkout and derives every
//! section of the [`StructuredReport`] from it, reading only a handful of
//! well-known files (manifests, CI workflows, a small sample of sources).
//! Nothing here talks to the network or to an agent.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{InspectError, Result};

/// Deepest level walked below the root (top-level entries are depth 0)
const MAX_DEPTH: usize = 3;
const SAMPLE_DEPTH: usize = 2;
const SAMPLE_FILES: usize = 5;
const TOP_EXTENSIONS: usize = 10;
const NO_EXTENSION: &str = "[no extension]";

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "__pycache__"];
const KEY_DIRECTORIES: &[&str] = &[
    "src", "lib", "tests", "test", "docs", "scripts", ".github", "config",
];

const LANGUAGES: &[(&str, &str)] = &[
    (".py", "Python"),
    (".js", "JavaScript"),
    (".ts", "TypeScript"),
    (".jsx", "React"),
    (".tsx", "React TypeScript"),
    (".go", "Go"),
    (".java", "Java"),
    (".rb", "Ruby"),
    (".php", "PHP"),
    (".rs", "Rust"),
    (".cpp", "C++"),
    (".c", "C"),
    (".cs", "C#"),
];

const PACKAGE_MANAGERS: &[(&str, &str)] = &[
    ("package.json", "Node.js/npm"),
    ("requirements.txt", "Python/pip"),
    ("Pipfile", "Python/pipenv"),
    ("pyproject.toml", "Python/poetry"),
    ("go.mod", "Go modules"),
    ("Cargo.toml", "Rust/Cargo"),
    ("pom.xml", "Java/Maven"),
    ("build.gradle", "Java/Gradle"),
    ("composer.json", "PHP/Composer"),
    ("Gemfile", "Ruby/Bundler"),
];

const NODE_FRAMEWORKS: &[(&str, &str)] = &[
    ("react", "React"),
    ("next", "Next.js"),
    ("vue", "Vue.js"),
    ("@angular/core", "Angular"),
    ("express", "Express"),
    ("fastify", "Fastify"),
];

const PYTHON_FRAMEWORKS: &[(&str, &str)] = &[
    ("django", "Django"),
    ("flask", "Flask"),
    ("fastapi", "FastAPI"),
];

/// Everything [`analyze`] learned about a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredReport {
    pub root: PathBuf,
    pub directory_structure: DirectoryStructure,
    pub file_types: FileTypes,
    pub technology_stack: TechnologyStack,
    pub code_patterns: CodePatterns,
    pub documentation: Documentation,
    pub testing: Testing,
    pub ci_cd: CiCd,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStructure {
    /// Directories seen within the walk depth
    pub total_directories: usize,
    pub top_level_dirs: Vec<String>,
    /// Conventional top-level directories that are present
    pub key_directories: Vec<String>,
    pub has_src: bool,
    pub has_tests: bool,
    pub has_docs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCount {
    /// Lowercased, with the leading dot, or `[no extension]`
    pub extension: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileTypes {
    pub total_files: usize,
    /// Most common extensions, most frequent first
    pub extensions: Vec<ExtensionCount>,
    pub primary_language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TechnologyStack {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub tools: Vec<String>,
    pub package_managers: Vec<String>,
}

/// Coarse signals from a small sample of source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodePatterns {
    pub files_sampled: usize,
    pub has_classes: bool,
    pub has_functions: bool,
    pub has_async: bool,
    pub has_tests: bool,
    pub architectural_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Documentation {
    pub has_readme: bool,
    pub has_contributing: bool,
    pub has_changelog: bool,
    pub has_license: bool,
    pub has_docs_folder: bool,
    /// Other top-level markdown files
    pub doc_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Testing {
    pub has_test_directory: bool,
    pub has_test_files: bool,
    pub test_frameworks: Vec<String>,
    pub has_coverage: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CiCd {
    pub platforms: Vec<String>,
    pub has_deployment: bool,
}

impl CiCd {
    pub fn has_ci(&self) -> bool {
        !self.platforms.is_empty()
    }
}

/// One walked entry, relative to the root
#[derive(Debug)]
struct Entry {
    relative: PathBuf,
    name: String,
    depth: usize,
    is_dir: bool,
}

/// Analyze the repository rooted at `root`.
///
/// Hidden directories other than `.github` are not descended into, nor are
/// dependency and build output directories. Unreadable subdirectories are
/// skipped; only an unreadable root is an error.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn analyze(root: &Path) -> Result<StructuredReport> {
    if !root.exists() {
        return Err(InspectError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(InspectError::NotADirectory(root.to_path_buf()));
    }

    let entries = collect(root)?;
    debug!(entries = entries.len(), "repository walked");

    let file_types = file_types(&entries);
    let report = StructuredReport {
        root: root.to_path_buf(),
        directory_structure: directory_structure(&entries),
        technology_stack: technology_stack(root, &entries),
        code_patterns: code_patterns(root, &entries),
        documentation: documentation(&entries),
        testing: testing(root, &entries),
        ci_cd: ci_cd(root),
        file_types,
    };
    Ok(report)
}

impl StructuredReport {
    /// Plain-text digest suitable for inclusion in an agent prompt.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string());
        lines.push(format!("Repository: {name}"));
        lines.push(format!(
            "Primary language: {}",
            self.file_types.primary_language.as_deref().unwrap_or("Unknown")
        ));

        let stack = &self.technology_stack;
        push_list(&mut lines, "Languages", &stack.languages);
        push_list(&mut lines, "Frameworks", &stack.frameworks);
        push_list(&mut lines, "Package managers", &stack.package_managers);
        push_list(&mut lines, "Tools", &stack.tools);

        let dirs = &self.directory_structure;
        let mut layout = format!("Layout: {} directories", dirs.total_directories);
        if !dirs.key_directories.is_empty() {
            layout.push_str(&format!("; key directories: {}", dirs.key_directories.join(", ")));
        }
        lines.push(layout);

        let top: Vec<String> = self
            .file_types
            .extensions
            .iter()
            .take(5)
            .map(|e| format!("{} ({})", e.extension, e.count))
            .collect();
        let mut files = format!("Files: {}", self.file_types.total_files);
        if !top.is_empty() {
            files.push_str(&format!(" (top types: {})", top.join(", ")));
        }
        lines.push(files);

        let code = &self.code_patterns;
        if code.files_sampled > 0 {
            let mut traits = Vec::new();
            for (present, label) in [
                (code.has_classes, "classes"),
                (code.has_functions, "functions"),
                (code.has_async, "async"),
                (code.has_tests, "tests"),
            ] {
                if present {
                    traits.push(label.to_string());
                }
            }
            let mut line = format!("Code ({} files sampled): ", code.files_sampled);
            if traits.is_empty() {
                line.push_str("no notable constructs");
            } else {
                line.push_str(&traits.join(", "));
            }
            if !code.architectural_patterns.is_empty() {
                line.push_str(&format!("; patterns: {}", code.architectural_patterns.join(", ")));
            }
            lines.push(line);
        }

        let testing = &self.testing;
        let mut tests = String::from("Testing: ");
        tests.push_str(if testing.has_test_directory || testing.has_test_files {
            "tests present"
        } else {
            "no tests found"
        });
        if !testing.test_frameworks.is_empty() {
            tests.push_str(&format!("; frameworks: {}", testing.test_frameworks.join(", ")));
        }
        if testing.has_coverage {
            tests.push_str("; coverage configured");
        }
        lines.push(tests);

        let docs = &self.documentation;
        let mut doc_parts = Vec::new();
        for (present, label) in [
            (docs.has_readme, "README"),
            (docs.has_contributing, "CONTRIBUTING"),
            (docs.has_changelog, "CHANGELOG"),
            (docs.has_license, "LICENSE"),
            (docs.has_docs_folder, "docs folder"),
        ] {
            if present {
                doc_parts.push(label.to_string());
            }
        }
        push_list(&mut lines, "Documentation", &doc_parts);

        if self.ci_cd.has_ci() {
            let mut ci = format!("CI/CD: {}", self.ci_cd.platforms.join(", "));
            if self.ci_cd.has_deployment {
                ci.push_str(" (with deployment)");
            }
            lines.push(ci);
        }

        lines.join("\n")
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, items: &[String]) {
    if !items.is_empty() {
        lines.push(format!("{label}: {}", items.join(", ")));
    }
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}

fn collect(root: &Path) -> Result<Vec<Entry>> {
    let top = read_sorted(root).map_err(|source| InspectError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let mut entries = Vec::new();
    visit(root, Path::new(""), top, 0, &mut entries);
    Ok(entries)
}

fn read_sorted(dir: &Path) -> std::io::Result<Vec<(String, bool)>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        items.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    items.sort();
    Ok(items)
}

fn visit(
    dir: &Path,
    relative: &Path,
    items: Vec<(String, bool)>,
    depth: usize,
    out: &mut Vec<Entry>,
) {
    for (name, is_dir) in items {
        if is_dir && is_skipped_dir(&name) {
            continue;
        }
        let child_relative = relative.join(&name);
        let descend = is_dir && depth < MAX_DEPTH;
        out.push(Entry {
            relative: child_relative.clone(),
            name: name.clone(),
            depth,
            is_dir,
        });
        if descend {
            let path = dir.join(&name);
            match read_sorted(&path) {
                Ok(children) => visit(&path, &child_relative, children, depth + 1, out),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable directory")
                }
            }
        }
    }
}

fn is_skipped_dir(name: &str) -> bool {
    (name.starts_with('.') && name != ".github") || SKIPPED_DIRS.contains(&name)
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| NO_EXTENSION.to_string())
}

fn language_for(extension: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

fn top_level(entries: &[Entry]) -> impl Iterator<Item = &Entry> {
    entries.iter().filter(|e| e.depth == 0)
}

fn has_top_level_file(entries: &[Entry], name: &str) -> bool {
    top_level(entries).any(|e| !e.is_dir && e.name == name)
}

fn has_top_level_dir(entries: &[Entry], names: &[&str]) -> bool {
    top_level(entries).any(|e| e.is_dir && names.contains(&e.name.as_str()))
}

fn directory_structure(entries: &[Entry]) -> DirectoryStructure {
    let top_level_dirs: Vec<String> = top_level(entries)
        .filter(|e| e.is_dir)
        .map(|e| e.name.clone())
        .collect();
    let key_directories = top_level_dirs
        .iter()
        .filter(|d| KEY_DIRECTORIES.contains(&d.as_str()))
        .cloned()
        .collect();

    DirectoryStructure {
        total_directories: entries.iter().filter(|e| e.is_dir).count(),
        has_src: has_top_level_dir(entries, &["src"]),
        has_tests: has_top_level_dir(entries, &["tests", "test"]),
        has_docs: has_top_level_dir(entries, &["docs", "doc"]),
        top_level_dirs,
        key_directories,
    }
}

/// Every extension with its count, most frequent first, ties by name
fn extension_counts(entries: &[Entry]) -> Vec<ExtensionCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in entries.iter().filter(|e| !e.is_dir) {
        *counts.entry(extension_of(&entry.name)).or_default() += 1;
    }
    let mut counts: Vec<ExtensionCount> = counts
        .into_iter()
        .map(|(extension, count)| ExtensionCount { extension, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
    counts
}

fn file_types(entries: &[Entry]) -> FileTypes {
    let mut counts = extension_counts(entries);
    let primary_language = counts
        .iter()
        .find_map(|c| language_for(&c.extension))
        .map(str::to_string);
    counts.truncate(TOP_EXTENSIONS);

    FileTypes {
        total_files: entries.iter().filter(|e| !e.is_dir).count(),
        extensions: counts,
        primary_language,
    }
}

fn technology_stack(root: &Path, entries: &[Entry]) -> TechnologyStack {
    let mut stack = TechnologyStack::default();

    for count in extension_counts(entries) {
        if let Some(language) = language_for(&count.extension) {
            push_unique(&mut stack.languages, language);
        }
    }

    for (file, manager) in PACKAGE_MANAGERS {
        if has_top_level_file(entries, file) {
            push_unique(&mut stack.package_managers, manager);
        }
    }

    if root.join(".github").join("workflows").is_dir() {
        push_unique(&mut stack.tools, "GitHub Actions");
    }
    if has_top_level_file(entries, "Dockerfile") {
        push_unique(&mut stack.tools, "Docker");
    }
    if has_top_level_file(entries, "docker-compose.yml")
        || has_top_level_file(entries, "docker-compose.yaml")
    {
        push_unique(&mut stack.tools, "Docker Compose");
    }
    if has_top_level_dir(entries, &["k8s", "kubernetes"]) {
        push_unique(&mut stack.tools, "Kubernetes");
    }
    if has_top_level_file(entries, "Makefile") {
        push_unique(&mut stack.tools, "Make");
    }

    if has_top_level_file(entries, "package.json") {
        let dependencies = node_dependencies(&root.join("package.json"));
        for (name, framework) in NODE_FRAMEWORKS {
            if dependencies.iter().any(|d| d == name) {
                push_unique(&mut stack.frameworks, framework);
            }
        }
    }
    let requirements = python_requirements(root);
    for (name, framework) in PYTHON_FRAMEWORKS {
        if requirements.iter().any(|r| r == name) {
            push_unique(&mut stack.frameworks, framework);
        }
    }

    stack
}

/// Dependency names from `dependencies` and `devDependencies`
fn node_dependencies(path: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let manifest: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "package.json is not valid JSON");
            return Vec::new();
        }
    };
    ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| manifest.get(section).and_then(|v| v.as_object()))
        .flat_map(|deps| deps.keys().cloned())
        .collect()
}

/// Lowercased distribution names from `requirements.txt`
fn python_requirements(root: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(root.join("requirements.txt")) else {
        return Vec::new();
    };
    text.lines().filter_map(requirement_name).collect()
}

fn requirement_name(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }
    let end = line
        .find(|c: char| "=<>~![ ;".contains(c))
        .unwrap_or(line.len());
    let name = line[..end].trim();
    (!name.is_empty()).then(|| name.to_lowercase())
}

fn is_sampled_source(entry: &Entry) -> bool {
    !entry.is_dir
        && entry.depth <= SAMPLE_DEPTH
        && !entry
            .relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        && language_for(&extension_of(&entry.name)).is_some()
}

fn code_patterns(root: &Path, entries: &[Entry]) -> CodePatterns {
    let mut patterns = CodePatterns::default();

    for entry in entries.iter().filter(|e| is_sampled_source(e)).take(SAMPLE_FILES) {
        let path = root.join(&entry.relative);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable source file");
                continue;
            }
        };
        patterns.files_sampled += 1;

        patterns.has_classes |= ["class ", "struct ", "interface "]
            .iter()
            .any(|t| content.contains(t));
        patterns.has_functions |= ["def ", "fn ", "func ", "function "]
            .iter()
            .any(|t| content.contains(t));
        patterns.has_async |= content.contains("async ") || content.contains("await");
        patterns.has_tests |= ["def test_", "#[test]", "@Test", "describe(", "import pytest"]
            .iter()
            .any(|t| content.contains(t));

        let lower = content.to_lowercase();
        if lower.contains("factory") {
            push_unique(&mut patterns.architectural_patterns, "Factory");
        }
        if lower.contains("singleton") {
            push_unique(&mut patterns.architectural_patterns, "Singleton");
        }
        if lower.contains("observer") || lower.contains("subscribe(") {
            push_unique(&mut patterns.architectural_patterns, "Observer");
        }
    }

    patterns
}

fn documentation(entries: &[Entry]) -> Documentation {
    let mut docs = Documentation {
        has_docs_folder: has_top_level_dir(entries, &["docs", "doc"]),
        ..Documentation::default()
    };

    for entry in top_level(entries).filter(|e| !e.is_dir) {
        let lower = entry.name.to_lowercase();
        if lower.starts_with("readme") {
            docs.has_readme = true;
        } else if lower.starts_with("contributing") {
            docs.has_contributing = true;
        } else if lower.starts_with("changelog") || lower.starts_with("history") {
            docs.has_changelog = true;
        } else if lower.starts_with("license") || lower.starts_with("copying") {
            docs.has_license = true;
        } else if lower.ends_with(".md") {
            docs.doc_files.push(entry.name.clone());
        }
    }

    docs
}

fn is_test_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with("test_")
        || lower.contains("_test.")
        || lower.contains(".test.")
        || lower.contains(".spec.")
        || lower == "conftest.py"
}

fn testing(root: &Path, entries: &[Entry]) -> Testing {
    let mut testing = Testing {
        has_test_directory: has_top_level_dir(entries, &["tests", "test", "spec", "__tests__"]),
        has_test_files: entries.iter().any(|e| !e.is_dir && is_test_file(&e.name)),
        ..Testing::default()
    };

    if has_top_level_file(entries, "pytest.ini")
        || entries.iter().any(|e| !e.is_dir && e.name == "conftest.py")
        || python_requirements(root).iter().any(|r| r == "pytest")
    {
        push_unique(&mut testing.test_frameworks, "pytest");
    }
    if has_top_level_file(entries, "setup.cfg")
        && fs::read_to_string(root.join("setup.cfg")).is_ok_and(|t| t.contains("[tool:pytest]"))
    {
        push_unique(&mut testing.test_frameworks, "pytest");
    }
    if has_top_level_file(entries, "tox.ini") {
        push_unique(&mut testing.test_frameworks, "tox");
    }
    if has_top_level_file(entries, "jest.config.js")
        || has_top_level_file(entries, "jest.config.ts")
    {
        push_unique(&mut testing.test_frameworks, "Jest");
    }
    if has_top_level_file(entries, "karma.conf.js") {
        push_unique(&mut testing.test_frameworks, "Karma");
    }

    testing.has_coverage = root.join(".coveragerc").is_file()
        || has_top_level_file(entries, "codecov.yml")
        || python_requirements(root)
            .iter()
            .any(|r| r == "coverage" || r == "pytest-cov");

    testing
}

fn ci_cd(root: &Path) -> CiCd {
    let mut ci = CiCd::default();

    let workflows = root.join(".github").join("workflows");
    if workflows.is_dir() {
        push_unique(&mut ci.platforms, "GitHub Actions");
        if let Ok(dir) = fs::read_dir(&workflows) {
            for entry in dir.flatten() {
                let is_workflow = matches!(
                    entry.path().extension().and_then(|e| e.to_str()),
                    Some("yml" | "yaml")
                );
                if is_workflow
                    && fs::read_to_string(entry.path())
                        .is_ok_and(|text| text.to_lowercase().contains("deploy"))
                {
                    ci.has_deployment = true;
                }
            }
        }
    }
    if root.join(".gitlab-ci.yml").is_file() {
        push_unique(&mut ci.platforms, "GitLab CI");
    }
    if root.join(".travis.yml").is_file() {
        push_unique(&mut ci.platforms, "Travis CI");
    }
    if root.join(".circleci").is_dir() {
        push_unique(&mut ci.platforms, "CircleCI");
    }
    if root.join("Jenkinsfile").is_file() {
        push_unique(&mut ci.platforms, "Jenkins");
    }

    ci
}
