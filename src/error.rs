use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    ProfileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Profile file name is not valid UTF-8: {}", .0.display())]
    InvalidProfileName(PathBuf),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Path must be a directory: {}", .0.display())]
    MustBeDirectory(PathBuf),

    #[error("Failed to enumerate tests: {0}")]
    EnumerationFailed(String),

    #[error("Test {test_name} failed to run: {reason}")]
    TestExecutionFailed { test_name: String, reason: String },

    #[error("Test {test_name} did not finish within {}s", .timeout.as_secs())]
    TestExecutionTimeout { test_name: String, timeout: Duration },

    #[error("Malformed profile line {line_number}{}: {line:?}", location(.path))]
    MalformedProfileLine {
        path: Option<PathBuf>,
        line_number: usize,
        line: String,
    },

    #[error(
        "Statement count mismatch for {branch}: previously {expected}, now {found}{}",
        location(.path)
    )]
    StatementCountMismatch {
        path: Option<PathBuf>,
        branch: String,
        expected: u64,
        found: u64,
    },

    #[error("No coverage data found in {}", .0.display())]
    NoCoverageDataFound(PathBuf),

    #[error("Unknown test: {0}")]
    UnknownTest(String),
}

impl DeltaError {
    /// Attach the profile path to parse-time and read errors raised without one.
    #[must_use]
    pub fn in_file(self, file: &std::path::Path) -> Self {
        match self {
            DeltaError::MalformedProfileLine {
                path: None,
                line_number,
                line,
            } => DeltaError::MalformedProfileLine {
                path: Some(file.to_path_buf()),
                line_number,
                line,
            },
            DeltaError::StatementCountMismatch {
                path: None,
                branch,
                expected,
                found,
            } => DeltaError::StatementCountMismatch {
                path: Some(file.to_path_buf()),
                branch,
                expected,
                found,
            },
            DeltaError::Io(source) => DeltaError::ProfileIo {
                path: file.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" in {}", p.display()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DeltaError>;
