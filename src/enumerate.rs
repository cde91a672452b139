//! Discovery of the test functions in a Go package.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::runner::TestRunner;

/// Go's rule: `Test` followed by nothing or a character that is not a
/// lowercase letter.
static TEST_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Test(?:[^\p{Ll}\W]\w*)?$").unwrap());

/// Ask the runner for its listing and keep only test names, in listing order.
pub fn enumerate_tests(runner: &dyn TestRunner) -> Result<Vec<String>> {
    let listing = runner.list()?;
    let tests = parse_test_list(&listing);
    tracing::info!(count = tests.len(), "enumerated tests");
    Ok(tests)
}

/// Extract test names from `go test -list` output. Benchmarks, examples,
/// fuzz targets and status lines are dropped.
#[must_use]
pub fn parse_test_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| TEST_NAME_RE.is_match(line))
        .map(str::to_string)
        .collect()
}
