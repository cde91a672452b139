//! Command handler functions for the deltacov CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::aggregate::aggregate_dir;
use crate::pipeline::{self, Config};
use crate::report::{build_report, DeltaReport, JsonFormatter, TextFormatter};

/// Output style for the report.
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum Style {
    #[default]
    Text,
    Json,
}

/// Run every test of the package in isolation and report delta coverage.
/// With `test`, only that test's line is printed.
pub fn cmd_run(config: &Config, test: Option<&str>, style: &Style) -> Result<String> {
    let report = pipeline::run(config).with_context(|| {
        format!(
            "Failed to compute delta coverage for {}",
            config.package_dir.display()
        )
    })?;
    render(report, test, style)
}

/// Report from profiles already on disk, e.g. a directory kept by an
/// earlier run.
pub fn cmd_from_profiles(dir: &Path, test: Option<&str>, style: &Style) -> Result<String> {
    let snapshot = aggregate_dir(dir)
        .with_context(|| format!("Failed to read coverage profiles in {}", dir.display()))?;
    render(build_report(&snapshot), test, style)
}

fn render(report: DeltaReport, test: Option<&str>, style: &Style) -> Result<String> {
    let report = match test {
        Some(name) => report.only(name)?,
        None => report,
    };

    let output = match style {
        Style::Text => report.format(&TextFormatter),
        Style::Json => report.format(&JsonFormatter),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Profiles for three tests over a two-statement function: two tests
    /// take the `if` branch, one takes the `else` branch.
    fn seed_profiles(dir: &Path) {
        let header = "mode: set\n";
        let if_hit = "example.com/calc/calc.go:3.24,5.2 1 1\nexample.com/calc/calc.go:5.2,7.2 1 0\n";
        let else_hit = "example.com/calc/calc.go:3.24,5.2 1 0\nexample.com/calc/calc.go:5.2,7.2 1 1\n";
        std::fs::write(
            dir.join("TestSumOnePlusOne.coverprofile"),
            format!("{header}{if_hit}"),
        )
        .unwrap();
        std::fs::write(
            dir.join("TestSumTwoPlusTwo.coverprofile"),
            format!("{header}{if_hit}"),
        )
        .unwrap();
        std::fs::write(
            dir.join("TestSubstractTwoMinusTwo.coverprofile"),
            format!("{header}{else_hit}"),
        )
        .unwrap();
    }

    #[test]
    fn test_cmd_from_profiles_text() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let out = cmd_from_profiles(dir.path(), None, &Style::Text).unwrap();

        assert_eq!(
            out,
            "TestSubstractTwoMinusTwo 50.0%\nTestSumOnePlusOne 0.0%\nTestSumTwoPlusTwo 0.0%\n"
        );
    }

    #[test]
    fn test_cmd_from_profiles_single_test() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let out =
            cmd_from_profiles(dir.path(), Some("TestSubstractTwoMinusTwo"), &Style::Text).unwrap();

        assert_eq!(out, "TestSubstractTwoMinusTwo 50.0%\n");
    }

    #[test]
    fn test_cmd_from_profiles_unknown_test() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let err = cmd_from_profiles(dir.path(), Some("TestNope"), &Style::Text).unwrap_err();
        assert!(err.to_string().contains("TestNope"));
    }

    #[test]
    fn test_cmd_from_profiles_json() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let out = cmd_from_profiles(dir.path(), None, &Style::Json).unwrap();

        assert!(out.contains("\"total_statements\": 2"));
        assert!(out.contains("\"delta_percent\": 50.0"));
    }

    #[test]
    fn test_cmd_from_profiles_empty_dir() {
        let dir = tempfile::tempdir().unwrap();

        let out = cmd_from_profiles(dir.path(), None, &Style::Text).unwrap();

        assert_eq!(out, "no tests found\n");
    }

    #[test]
    fn test_cmd_from_profiles_missing_dir() {
        let dir = tempfile::tempdir().unwrap();

        let err = cmd_from_profiles(&dir.path().join("gone"), None, &Style::Text).unwrap_err();

        assert!(err.to_string().contains("Failed to read coverage profiles"));
    }
}
