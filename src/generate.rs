//! Sequential per-test coverage generation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeltaError, Result};
use crate::model::profile_file_name;
use crate::runner::TestRunner;

/// Run every test alone, in the given order, writing
/// `<out_dir>/<test>.coverprofile` for each. Returns the profile paths.
///
/// Runs never overlap: each one is waited for before the next starts. A test
/// that fails its assertions still leaves a usable profile and is accepted.
/// The first run that produces no profile aborts the step; profiles from
/// earlier runs stay on disk.
pub fn generate_profiles(
    runner: &dyn TestRunner,
    tests: &[String],
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(tests.len());

    for (i, test_name) in tests.iter().enumerate() {
        let path = out_dir.join(profile_file_name(test_name));
        // A leftover file would mask a run that wrote nothing.
        if path.exists() {
            fs::remove_file(&path)?;
        }

        tracing::debug!(test = %test_name, "running {}/{}", i + 1, tests.len());
        let status = runner.run_isolated(test_name, &path)?;

        if !path.is_file() {
            let reason = if status.success {
                "no coverage profile was written".to_string()
            } else {
                stderr_reason(&status.stderr)
            };
            return Err(DeltaError::TestExecutionFailed {
                test_name: test_name.clone(),
                reason,
            });
        }

        if !status.success {
            tracing::warn!(test = %test_name, "test failed; its coverage is still counted");
        }
        paths.push(path);
    }

    tracing::info!(count = paths.len(), "generated coverage profiles");
    Ok(paths)
}

fn stderr_reason(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "go test exited with failure".to_string()
    } else {
        trimmed.to_string()
    }
}
