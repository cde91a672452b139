//! Folding per-test coverage profiles into a single attribution snapshot.
//!
//! Every profile lists the same statement universe; what differs between
//! tests is which blocks were visited. The snapshot counts, per block, how
//! many distinct tests visited it. Blocks with a count of exactly one are
//! "unique": deleting the owning test would lose their coverage.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{DeltaError, Result};
use crate::model::{test_name_from_file_name, BranchRecord, Profile, PROFILE_EXTENSION};
use crate::profile;

/// Attribution state for one pipeline run. Built fresh each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageSnapshot {
    /// Statements in the whole package, taken from the first profile only.
    pub total_statements: u64,
    /// Block id → number of distinct tests that visited it.
    pub branch_visit_count: HashMap<String, u32>,
    /// Block id → statement count, recorded on first visit.
    pub branch_statements: HashMap<String, u64>,
    /// Blocks visited by exactly one test. Valid after [`finalize`](Self::finalize).
    pub unique_branches: HashMap<String, u64>,
    /// Test name → blocks it visited, in profile order. Every folded test has
    /// an entry, even one that visited nothing.
    pub test_branches: BTreeMap<String, Vec<String>>,
    profiles_folded: usize,
}

/// One profile's records with repeated ids collapsed. The last line for an
/// id wins, keeping the position of its first appearance.
#[derive(Default)]
struct CollapsedProfile {
    order: Vec<String>,
    entries: HashMap<String, (u64, bool)>,
}

impl CollapsedProfile {
    fn push(&mut self, record: BranchRecord) -> Result<()> {
        let visited = record.visited();
        match self.entries.get_mut(&record.id) {
            Some((statements, _)) if *statements != record.statements => {
                Err(DeltaError::StatementCountMismatch {
                    path: None,
                    branch: record.id,
                    expected: *statements,
                    found: record.statements,
                })
            }
            Some((_, seen_visited)) => {
                *seen_visited = visited;
                Ok(())
            }
            None => {
                self.entries
                    .insert(record.id.clone(), (record.statements, visited));
                self.order.push(record.id);
                Ok(())
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&str, u64, bool)> {
        self.order.iter().map(move |id| {
            let (statements, visited) = self.entries[id];
            (id.as_str(), statements, visited)
        })
    }
}

impl CoverageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of profiles folded in so far.
    #[must_use]
    pub fn profiles_folded(&self) -> usize {
        self.profiles_folded
    }

    /// True when no test has been folded in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.test_branches.is_empty()
    }

    /// Fold an already-parsed profile.
    pub fn fold_profile(&mut self, profile: &Profile) -> Result<()> {
        let mut collapsed = CollapsedProfile::default();
        for record in &profile.records {
            collapsed.push(record.clone())?;
        }
        self.fold_collapsed(&profile.test_name, &collapsed)
    }

    /// Stream-parse one profile file and fold it. The test name comes from
    /// the file name.
    pub fn fold_file(&mut self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DeltaError::InvalidProfileName(path.to_path_buf()))?;
        let test_name = test_name_from_file_name(file_name).to_string();

        let file = File::open(path).map_err(|e| DeltaError::Io(e).in_file(path))?;
        let mut reader = BufReader::new(file);
        let mut collapsed = CollapsedProfile::default();
        let mode = profile::parse_streaming(&mut reader, &mut |record| collapsed.push(record))
            .map_err(|e| e.in_file(path))?;
        tracing::debug!(path = %path.display(), %mode, "parsed coverage profile");

        self.fold_collapsed(&test_name, &collapsed)
            .map_err(|e| e.in_file(path))
    }

    fn fold_collapsed(&mut self, test_name: &str, profile: &CollapsedProfile) -> Result<()> {
        // Reject contradictions before touching any state.
        for (id, statements, _) in profile.iter() {
            if let Some(&expected) = self.branch_statements.get(id) {
                if expected != statements {
                    return Err(DeltaError::StatementCountMismatch {
                        path: None,
                        branch: id.to_string(),
                        expected,
                        found: statements,
                    });
                }
            }
        }

        if self.profiles_folded == 0 {
            self.total_statements = profile.iter().map(|(_, statements, _)| statements).sum();
        }
        self.profiles_folded += 1;

        // A test seen twice must not count as two visitors of the same block.
        let already_visited: HashSet<String> = self
            .test_branches
            .get(test_name)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();

        let mut visited_now = Vec::new();
        for (id, statements, visited) in profile.iter() {
            if !visited || already_visited.contains(id) {
                continue;
            }
            self.branch_statements
                .entry(id.to_string())
                .or_insert(statements);
            *self.branch_visit_count.entry(id.to_string()).or_insert(0) += 1;
            visited_now.push(id.to_string());
        }

        tracing::debug!(
            test = test_name,
            visited = visited_now.len(),
            "folded coverage profile"
        );
        self.test_branches
            .entry(test_name.to_string())
            .or_default()
            .extend(visited_now);
        Ok(())
    }

    /// Recompute `unique_branches` from the visit counts.
    pub fn finalize(&mut self) {
        self.unique_branches = self
            .branch_visit_count
            .iter()
            .filter(|(_, &count)| count == 1)
            .filter_map(|(id, _)| {
                self.branch_statements
                    .get(id)
                    .map(|&statements| (id.clone(), statements))
            })
            .collect();
    }

    /// Statements covered by `test_name` and by no other test.
    #[must_use]
    pub fn unique_statements(&self, test_name: &str) -> u64 {
        self.test_branches
            .get(test_name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.unique_branches.get(id))
                    .sum::<u64>()
            })
            .unwrap_or(0)
    }

    /// Register a test that produced no profile, so it is reported at 0.0%.
    pub fn register_test(&mut self, test_name: &str) {
        self.test_branches.entry(test_name.to_string()).or_default();
    }
}

/// List profile files in `dir`, sorted by file name.
pub fn profile_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(DeltaError::PathNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(DeltaError::MustBeDirectory(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_profile = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == PROFILE_EXTENSION);
        if !is_profile || !path.is_file() {
            continue;
        }
        // The test name is read from the file name.
        if path.file_name().and_then(|n| n.to_str()).is_none() {
            tracing::warn!(path = %path.display(), "skipping profile with a non-UTF-8 name");
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

/// Fold every profile in `dir` into a fresh snapshot. An empty directory
/// yields an empty snapshot. Any error aborts with no partial snapshot.
pub fn aggregate_dir(dir: &Path) -> Result<CoverageSnapshot> {
    let mut snapshot = CoverageSnapshot::new();
    for path in profile_paths(dir)? {
        snapshot.fold_file(&path)?;
    }
    snapshot.finalize();

    tracing::info!(
        profiles = snapshot.profiles_folded(),
        total_statements = snapshot.total_statements,
        unique_branches = snapshot.unique_branches.len(),
        "aggregated coverage"
    );
    Ok(snapshot)
}

/// Like [`aggregate_dir`], but an empty directory is an error.
pub fn aggregate_dir_strict(dir: &Path) -> Result<CoverageSnapshot> {
    let snapshot = aggregate_dir(dir)?;
    if snapshot.profiles_folded() == 0 {
        return Err(DeltaError::NoCoverageDataFound(dir.to_path_buf()));
    }
    Ok(snapshot)
}
