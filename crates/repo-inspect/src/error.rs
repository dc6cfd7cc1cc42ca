//! Error types for repository inspection

use std::path::PathBuf;

/// Result type for repo-inspect
pub type Result<T> = std::result::Result<T, InspectError>;

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("Repository root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Repository root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
