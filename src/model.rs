//! In-memory representation of Go coverage profiles. The profile parser
//! produces these records; the aggregator folds them into a snapshot.

use std::fmt;
use std::str::FromStr;

use crate::error::DeltaError;

/// File extension used for every generated per-test profile.
pub const PROFILE_EXTENSION: &str = "coverprofile";

/// Counter mode declared on the first line of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Set,
    Count,
    Atomic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Set => "set",
            Mode::Count => "count",
            Mode::Atomic => "atomic",
        }
    }
}

impl FromStr for Mode {
    type Err = DeltaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "set" => Ok(Mode::Set),
            "count" => Ok(Mode::Count),
            "atomic" => Ok(Mode::Atomic),
            _ => Err(DeltaError::MalformedProfileLine {
                path: None,
                line_number: 1,
                line: format!("mode: {s}"),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a coverage profile: a statement group and whether it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    pub id: String,
    pub statements: u64,
    pub visits: u64,
}

impl BranchRecord {
    #[must_use]
    pub fn visited(&self) -> bool {
        self.visits > 0
    }
}

/// A single test's coverage observation.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub test_name: String,
    pub mode: Mode,
    pub records: Vec<BranchRecord>,
}

/// Derive the owning test name from a profile file name: everything before
/// the first '.'.
#[must_use]
pub fn test_name_from_file_name(file_name: &str) -> &str {
    file_name
        .split_once('.')
        .map_or(file_name, |(stem, _)| stem)
}

/// File name under which a test's profile is written.
#[must_use]
pub fn profile_file_name(test_name: &str) -> String {
    format!("{test_name}.{PROFILE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("set".parse::<Mode>().unwrap(), Mode::Set);
        assert_eq!("count".parse::<Mode>().unwrap(), Mode::Count);
        assert_eq!("atomic".parse::<Mode>().unwrap(), Mode::Atomic);
        assert!("bogus".parse::<Mode>().is_err());
    }

    #[test]
    fn test_test_name_from_file_name() {
        assert_eq!(test_name_from_file_name("TestSum.coverprofile"), "TestSum");
        assert_eq!(test_name_from_file_name("TestSum.extra.coverprofile"), "TestSum");
        assert_eq!(test_name_from_file_name("TestSum"), "TestSum");
    }

    #[test]
    fn test_profile_file_name() {
        assert_eq!(profile_file_name("TestSum"), "TestSum.coverprofile");
    }

    #[test]
    fn test_visited() {
        let mut record = BranchRecord {
            id: "f.go:1.1,2.2".to_string(),
            statements: 2,
            visits: 0,
        };
        assert!(!record.visited());
        record.visits = 3;
        assert!(record.visited());
    }
}
