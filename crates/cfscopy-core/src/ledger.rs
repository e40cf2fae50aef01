//! Completion ledger: rebuilding resume state from a previous run's log
//!
//! A run log is a sequence of [`Event`] lines. Every Info-level completion
//! record (`Directory : <path>`, `File : <path>` and their "already exists"
//! variants) names a destination path that a prior run fully materialized.
//! Collecting those paths gives the [`CompletionSet`] a resumed run consults
//! before touching each entry.
//!
//! The ledger is advisory. It never checks that a recorded path still exists
//! at the destination or that its contents are intact.

use crate::error::{Error, Result};
use crate::event::{Completion, Event};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Destination paths already materialized by a previous run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSet {
    paths: HashSet<PathBuf>,
}

impl CompletionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed destination path
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    /// Whether `path` was completed by a previous run
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Number of distinct completed paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over the completed paths in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }
}

impl FromIterator<PathBuf> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Statistics gathered while scanning a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerScan {
    /// Lines read
    pub lines: usize,
    /// Completion records found (before de-duplication)
    pub completions: usize,
    /// Lines that were not well-formed events
    pub malformed: usize,
}

/// Extract the completed path from one log line, if it is a completion record
pub fn completed_path(line: &str) -> Option<(Completion, PathBuf)> {
    Event::parse_line(line)?.as_completion()
}

/// Build a completion set from any reader over log text
pub fn parse_completed_from<R: Read>(reader: R) -> std::io::Result<(CompletionSet, LedgerScan)> {
    let mut set = CompletionSet::new();
    let mut scan = LedgerScan::default();

    // Read raw bytes so one invalid UTF-8 line does not abort the scan
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        scan.lines += 1;

        let line = String::from_utf8_lossy(&buffer);
        if line.trim().is_empty() {
            continue;
        }
        match Event::parse_line(&line) {
            Some(event) => {
                if let Some((_, path)) = event.as_completion() {
                    scan.completions += 1;
                    set.insert(path);
                }
            }
            None => scan.malformed += 1,
        }
    }

    Ok((set, scan))
}

/// Parse a previous run's log into the set of completed destination paths
pub fn parse_completed<P: AsRef<Path>>(log_path: P) -> Result<CompletionSet> {
    let log_path = log_path.as_ref();
    let file = File::open(log_path).map_err(|source| Error::Ledger {
        path: log_path.to_path_buf(),
        source,
    })?;

    let (set, scan) = parse_completed_from(file).map_err(|source| Error::Ledger {
        path: log_path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        "Parsed {:?}: {} lines, {} completion records, {} distinct paths, {} malformed",
        log_path,
        scan.lines,
        scan.completions,
        set.len(),
        scan.malformed
    );

    Ok(set)
}
