//! Fake agent executables.
//!
//! Each helper writes an executable `/bin/sh` script into a directory and
//! returns its path. Every script:
//!
//! - answers `--version` with `<name> 1.0.0-test`
//! - appends its arguments, one per line, to `<name>.args`
//! - appends its stdin (if any was piped) to `<name>.stdin`
//!
//! Unix only.

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable script named `name` whose behaviour is `body`.
///
/// # Panics
/// Panics if the file cannot be written or made executable.
pub fn fake_agent_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let log_prefix = dir.join(name);
    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "{name} 1.0.0-test"
  exit 0
fi
printf '%s\n' "$@" >> "{log}.args"
if [ ! -t 0 ]; then
  cat >> "{log}.stdin"
fi
{body}
"#,
        log = log_prefix.display(),
    );
    fs::write(&path, script)
        .unwrap_or_else(|e| panic!("fake_agent_script: failed to write {}: {e}", path.display()));
    make_executable(&path);
    path
}

/// A script that always prints `json` and exits 0
pub fn json_agent_script(dir: &Path, name: &str, json: &str) -> PathBuf {
    fake_agent_script(dir, name, &format!("cat <<'JSON'\n{json}\nJSON\nexit 0"))
}

/// A script that exits 1 with `stderr` for its first `failures` runs, then
/// prints `json`. The run count is kept in `<name>.count`.
pub fn flaky_agent_script(
    dir: &Path,
    name: &str,
    failures: u32,
    stderr: &str,
    json: &str,
) -> PathBuf {
    let count_file = dir.join(format!("{name}.count"));
    let body = format!(
        r#"n=$(cat "{count}" 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > "{count}"
if [ "$n" -le {failures} ]; then
  echo '{stderr}' >&2
  exit 1
fi
cat <<'JSON'
{json}
JSON
exit 0"#,
        count = count_file.display(),
    );
    fake_agent_script(dir, name, &body)
}

/// A script that exits with `code` and prints `stderr`
pub fn failing_agent_script(dir: &Path, name: &str, code: i32, stderr: &str) -> PathBuf {
    fake_agent_script(dir, name, &format!("echo '{stderr}' >&2\nexit {code}"))
}

/// How many times a [`flaky_agent_script`] has run
pub fn run_count(dir: &Path, name: &str) -> u32 {
    fs::read_to_string(dir.join(format!("{name}.count")))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Arguments recorded across every run of the script, one per line
pub fn recorded_args(dir: &Path, name: &str) -> Vec<String> {
    fs::read_to_string(dir.join(format!("{name}.args")))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Stdin recorded across every run of the script
pub fn recorded_stdin(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(format!("{name}.stdin"))).unwrap_or_default()
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|e| panic!("fake_agent_script: chmod {} failed: {e}", path.display()));
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
