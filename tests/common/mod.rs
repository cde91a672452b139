#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use deltacov::error::Result;
use deltacov::runner::{RunStatus, TestRunner};
use tempfile::TempDir;

/// Render a profile: header plus one `<id> <stmts> <visits>` line per block.
pub fn profile_text(records: &[(&str, u64, u64)]) -> String {
    let mut text = String::from("mode: set\n");
    for (id, statements, visits) in records {
        text.push_str(&format!("{id} {statements} {visits}\n"));
    }
    text
}

/// Create a fresh temporary directory holding one profile per test. The
/// caller must hold onto `TempDir` to keep the directory alive.
pub fn profile_dir(profiles: &[(&str, &[(&str, u64, u64)])]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (test, records) in profiles {
        std::fs::write(
            dir.path().join(format!("{test}.coverprofile")),
            profile_text(records),
        )
        .unwrap();
    }
    dir
}

/// In-memory stand-in for `go test`: lists its tests and writes each test's
/// canned profile when asked to run it.
pub struct FakeGo {
    pub listing: String,
    pub profiles: BTreeMap<String, String>,
    pub runs: RefCell<Vec<String>>,
}

impl FakeGo {
    pub fn new(profiles: &[(&str, &[(&str, u64, u64)])]) -> Self {
        let mut listing = String::new();
        let mut map = BTreeMap::new();
        for (test, records) in profiles {
            listing.push_str(test);
            listing.push('\n');
            map.insert(test.to_string(), profile_text(records));
        }
        listing.push_str("ok  \texample.com/calc\t0.004s\n");
        Self {
            listing,
            profiles: map,
            runs: RefCell::new(Vec::new()),
        }
    }
}

impl TestRunner for FakeGo {
    fn list(&self) -> Result<String> {
        Ok(self.listing.clone())
    }

    fn run_isolated(&self, test_name: &str, profile_path: &Path) -> Result<RunStatus> {
        self.runs.borrow_mut().push(test_name.to_string());
        if let Some(text) = self.profiles.get(test_name) {
            std::fs::write(profile_path, text)?;
        }
        Ok(RunStatus {
            success: true,
            stderr: String::new(),
        })
    }
}
