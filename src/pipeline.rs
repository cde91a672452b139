//! End-to-end attribution run: enumerate, generate, aggregate, report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::{aggregate_dir, aggregate_dir_strict};
use crate::enumerate::enumerate_tests;
use crate::error::{DeltaError, Result};
use crate::generate::generate_profiles;
use crate::report::{build_report, DeltaReport};
use crate::runner::{GoTestRunner, TestRunner};
use crate::workspace::ProfileDir;

/// Settings for one run, usually built from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of the Go package under test.
    pub package_dir: PathBuf,
    /// The `go` binary to invoke.
    pub go: PathBuf,
    /// Deadline for each isolated test run.
    pub timeout: Option<Duration>,
    /// Leave the profile directory on disk even after success.
    pub keep_profiles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_dir: PathBuf::from("."),
            go: PathBuf::from("go"),
            timeout: None,
            keep_profiles: false,
        }
    }
}

/// Run the full pipeline against the real `go` tool.
pub fn run(config: &Config) -> Result<DeltaReport> {
    check_dir(&config.package_dir)?;
    let runner = GoTestRunner::new(&config.package_dir)
        .with_go(&config.go)
        .with_timeout(config.timeout);
    run_with(&runner, config.keep_profiles)
}

/// Run the pipeline with any runner inside a fresh temporary directory.
///
/// The directory is removed on success unless `keep_profiles` is set. On
/// failure it is always left behind and its path logged.
pub fn run_with(runner: &dyn TestRunner, keep_profiles: bool) -> Result<DeltaReport> {
    let profile_dir = ProfileDir::create()?;

    match attribute(runner, profile_dir.path()) {
        Ok(report) => {
            if keep_profiles {
                let path = profile_dir.keep();
                tracing::info!(path = %path.display(), "kept coverage profiles");
            } else {
                profile_dir.remove()?;
            }
            Ok(report)
        }
        Err(e) => {
            let path = profile_dir.keep();
            tracing::warn!(path = %path.display(), "run failed; coverage profiles left for inspection");
            Err(e)
        }
    }
}

/// Enumerate, generate into `out_dir`, aggregate and report. `out_dir` must
/// be owned by this run.
pub fn attribute(runner: &dyn TestRunner, out_dir: &Path) -> Result<DeltaReport> {
    let tests = enumerate_tests(runner)?;
    generate_profiles(runner, &tests, out_dir)?;

    let mut snapshot = if tests.is_empty() {
        aggregate_dir(out_dir)?
    } else {
        aggregate_dir_strict(out_dir)?
    };
    for test in &tests {
        snapshot.register_test(test);
    }

    Ok(build_report(&snapshot))
}

fn check_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(DeltaError::PathNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(DeltaError::MustBeDirectory(dir.to_path_buf()));
    }
    Ok(())
}
