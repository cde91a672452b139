//! Per-test delta coverage results and their output formats.

use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::CoverageSnapshot;
use crate::error::{DeltaError, Result};

/// Printed instead of an empty listing when no test was discovered.
pub const NO_TESTS_FOUND: &str = "no tests found";

/// Coverage a single test owns exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDelta {
    pub test: String,
    /// Statements covered by this test and no other.
    pub unique_statements: u64,
    /// Delta coverage in tenths of a percent, rounded half away from zero.
    pub delta_tenths: u64,
}

impl TestDelta {
    #[must_use]
    pub fn delta_percent(&self) -> f64 {
        self.delta_tenths as f64 / 10.0
    }
}

/// Delta coverage for every test of one run, sorted by test name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    pub total_statements: u64,
    pub tests: Vec<TestDelta>,
}

impl DeltaReport {
    /// Format using a specific formatter.
    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format(self)
    }

    /// Restrict the report to a single test.
    pub fn only(self, test: &str) -> Result<DeltaReport> {
        let tests: Vec<TestDelta> = self.tests.into_iter().filter(|t| t.test == test).collect();
        if tests.is_empty() {
            return Err(DeltaError::UnknownTest(test.to_string()));
        }
        Ok(DeltaReport {
            total_statements: self.total_statements,
            tests,
        })
    }
}

/// `100 * unique / total` in tenths of a percent, rounded half away from
/// zero using integer arithmetic only. Zero when `total` is zero.
#[must_use]
pub fn delta_tenths(unique: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (unique, total) = (u128::from(unique), u128::from(total));
    ((2000 * unique + total) / (2 * total)) as u64
}

/// Render tenths of a percent as `12.3`.
#[must_use]
pub fn format_tenths(tenths: u64) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// Build the report from a finalized snapshot. Every test with an entry in
/// `test_branches` is listed, including those owning nothing.
#[must_use]
pub fn build_report(snapshot: &CoverageSnapshot) -> DeltaReport {
    let tests = snapshot
        .test_branches
        .keys()
        .map(|test| {
            let unique_statements = snapshot.unique_statements(test);
            TestDelta {
                test: test.clone(),
                unique_statements,
                delta_tenths: delta_tenths(unique_statements, snapshot.total_statements),
            }
        })
        .collect();

    DeltaReport {
        total_statements: snapshot.total_statements,
        tests,
    }
}

/// Trait for formatting delta coverage reports.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &DeltaReport) -> String;
}

/// One `<test> <delta>%` line per test.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &DeltaReport) -> String {
        if report.tests.is_empty() {
            return format!("{NO_TESTS_FOUND}\n");
        }

        let mut out = String::new();
        for t in &report.tests {
            writeln!(out, "{} {}%", t.test, format_tenths(t.delta_tenths)).unwrap();
        }
        out
    }
}

/// Machine-readable output.
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonReport<'a> {
    total_statements: u64,
    tests: Vec<JsonTest<'a>>,
}

#[derive(Serialize)]
struct JsonTest<'a> {
    test: &'a str,
    delta_percent: f64,
    unique_statements: u64,
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &DeltaReport) -> String {
        let json = JsonReport {
            total_statements: report.total_statements,
            tests: report
                .tests
                .iter()
                .map(|t| JsonTest {
                    test: &t.test,
                    delta_percent: t.delta_percent(),
                    unique_statements: t.unique_statements,
                })
                .collect(),
        };
        let mut out = serde_json::to_string_pretty(&json).unwrap();
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BranchRecord, Profile};

    fn snapshot_of(profiles: &[(&str, Vec<(&str, u64, u64)>)]) -> CoverageSnapshot {
        let mut snapshot = CoverageSnapshot::new();
        for (test, records) in profiles {
            let profile = Profile {
                test_name: test.to_string(),
                records: records
                    .iter()
                    .map(|&(id, statements, visits)| BranchRecord {
                        id: id.to_string(),
                        statements,
                        visits,
                    })
                    .collect(),
                ..Default::default()
            };
            snapshot.fold_profile(&profile).unwrap();
        }
        snapshot.finalize();
        snapshot
    }

    #[test]
    fn test_delta_tenths_rounding() {
        assert_eq!(delta_tenths(1, 2), 500);
        assert_eq!(delta_tenths(1, 3), 333);
        assert_eq!(delta_tenths(2, 3), 667);
        // 1/16 = 6.25% -> 6.3%, half away from zero
        assert_eq!(delta_tenths(1, 16), 63);
        // 1/80 = 1.25% -> 1.3%
        assert_eq!(delta_tenths(1, 80), 13);
        assert_eq!(delta_tenths(0, 7), 0);
        assert_eq!(delta_tenths(7, 7), 1000);
        assert_eq!(delta_tenths(3, 0), 0);
    }

    #[test]
    fn test_format_tenths() {
        assert_eq!(format_tenths(0), "0.0");
        assert_eq!(format_tenths(5), "0.5");
        assert_eq!(format_tenths(500), "50.0");
        assert_eq!(format_tenths(1000), "100.0");
    }

    #[test]
    fn test_three_tests_one_owns_else_branch() {
        let snapshot = snapshot_of(&[
            ("TestSumOnePlusOne", vec![("if", 1, 1), ("else", 1, 0)]),
            ("TestSumTwoPlusTwo", vec![("if", 1, 1), ("else", 1, 0)]),
            ("TestSubstract", vec![("if", 1, 0), ("else", 1, 1)]),
        ]);

        let out = build_report(&snapshot).format(&TextFormatter);
        assert_eq!(
            out,
            "TestSubstract 50.0%\nTestSumOnePlusOne 0.0%\nTestSumTwoPlusTwo 0.0%\n"
        );
    }

    #[test]
    fn test_empty_report_prints_sentinel() {
        let report = build_report(&CoverageSnapshot::new());
        assert_eq!(report.format(&TextFormatter), "no tests found\n");
    }

    #[test]
    fn test_sorted_by_name_not_fold_order() {
        let snapshot = snapshot_of(&[("TestZ", vec![("a", 1, 1)]), ("TestA", vec![("a", 1, 0)])]);
        let report = build_report(&snapshot);
        let names: Vec<_> = report.tests.iter().map(|t| t.test.as_str()).collect();
        assert_eq!(names, vec!["TestA", "TestZ"]);
        assert_eq!(report.tests[1].delta_tenths, 1000);
    }

    #[test]
    fn test_only_single_test() {
        let snapshot = snapshot_of(&[
            ("TestA", vec![("a", 1, 1), ("b", 1, 0)]),
            ("TestB", vec![("a", 1, 0), ("b", 1, 1)]),
        ]);
        let report = build_report(&snapshot).only("TestB").unwrap();
        assert_eq!(report.format(&TextFormatter), "TestB 50.0%\n");
    }

    #[test]
    fn test_only_unknown_test() {
        let snapshot = snapshot_of(&[("TestA", vec![("a", 1, 1)])]);
        let err = build_report(&snapshot).only("TestMissing").unwrap_err();
        assert!(matches!(err, DeltaError::UnknownTest(name) if name == "TestMissing"));
    }

    #[test]
    fn test_json_format() {
        let snapshot = snapshot_of(&[("TestA", vec![("a", 1, 1), ("b", 3, 0)])]);
        let out = build_report(&snapshot).format(&JsonFormatter);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total_statements"], 4);
        assert_eq!(value["tests"][0]["test"], "TestA");
        assert_eq!(value["tests"][0]["delta_percent"], 25.0);
        assert_eq!(value["tests"][0]["unique_statements"], 1);
    }
}
