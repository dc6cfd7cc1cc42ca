//! [`TestRepo`] builder for repository inspection and workflow scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch repository on disk, removed when dropped.
///
/// ```rust,no_run
/// use repo_test_utils::TestRepo;
///
/// let repo = TestRepo::sample_python_project();
/// assert!(repo.path("src/auth.py").exists());
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// A small Flask project with tests, docs, CI and a Dockerfile.
    pub fn sample_python_project() -> Self {
        let repo = Self::new();
        repo.write(
            "src/auth.py",
            "import bcrypt\n\n\nclass Authenticator:\n    def login(self, user, password):\n        return bcrypt.checkpw(password, user.hash)\n",
        );
        repo.write(
            "src/user.py",
            "from dataclasses import dataclass\n\n\n@dataclass\nclass User:\n    name: str\n    hash: bytes\n",
        );
        repo.write(
            "src/app.py",
            "from flask import Flask\n\napp = Flask(__name__)\n\n\n@app.route('/')\ndef index():\n    return 'ok'\n",
        );
        repo.write(
            "tests/test_auth.py",
            "import pytest\n\n\ndef test_login():\n    assert True\n",
        );
        repo.write("requirements.txt", "flask==3.0.0\nbcrypt==4.1.2\npytest==8.0.0\n");
        repo.write("README.md", "# Sample\n\nA sample service.\n");
        repo.write("docs/architecture.md", "# Architecture\n");
        repo.write(
            ".github/workflows/ci.yml",
            "name: ci\non: [push]\njobs:\n  test:\n    runs-on: ubuntu-latest\n",
        );
        repo.write("Dockerfile", "FROM python:3.12-slim\n");
        repo
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the repository.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}
