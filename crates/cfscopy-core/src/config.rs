//! Run configuration for cfscopy operations

use crate::error::{Error, Result};
use crate::writer::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default number of attempts per operation
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between attempts, in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Bounded retry policy applied uniformly to every mkdir and copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (first attempt counts as 1)
    pub max_attempts: u32,

    /// Blocking delay between a failed attempt and the next one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, rejecting a zero attempt budget
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }
}

/// How the durable writer gets bytes onto stable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Buffered writes, then flush and fsync
    #[default]
    Buffered,
    /// Write-through handle; each write bypasses the page cache
    Sync,
}

impl WriteMode {
    /// Name as accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            WriteMode::Buffered => "buffered",
            WriteMode::Sync => "sync",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration of a single replication run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the tree to replicate
    pub source_root: PathBuf,

    /// Root under which the tree is recreated
    pub destination_root: PathBuf,

    /// Retry policy for every operation
    pub retry_policy: RetryPolicy,

    /// Durable writer strategy
    pub write_mode: WriteMode,

    /// Block size for file copies
    pub block_size: usize,

    /// Read back and compare each copied file
    pub verify: bool,

    /// Previous run's log to resume from
    pub resume_log: Option<PathBuf>,
}

impl RunConfig {
    /// Create a config with defaults for everything but the two roots
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: trim_trailing_separators(source_root.into()),
            destination_root: trim_trailing_separators(destination_root.into()),
            retry_policy: RetryPolicy::default(),
            write_mode: WriteMode::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            verify: false,
            resume_log: None,
        }
    }

    /// Set the retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the write mode
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Set block size (clamped to valid range)
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        self
    }

    /// Set verify mode
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Resume from a previous run's log
    pub fn resume_log(mut self, log: Option<PathBuf>) -> Self {
        self.resume_log = log;
        self
    }

    /// Check the root invariants without touching the filesystem.
    ///
    /// Source and destination are compared after making them absolute and
    /// lexically normalizing them (case-folded on Windows).
    pub fn validate_roots(&self) -> Result<()> {
        let source = normalize_for_compare(&self.source_root)?;
        let destination = normalize_for_compare(&self.destination_root)?;

        if source == destination {
            return Err(Error::SameDirectory {
                source_root: self.source_root.clone(),
                destination_root: self.destination_root.clone(),
            });
        }

        if destination.starts_with(&source) {
            return Err(Error::NestedDestination {
                source_root: self.source_root.clone(),
                destination_root: self.destination_root.clone(),
            });
        }

        Ok(())
    }

    /// Every check that must pass before a run touches the filesystem:
    /// the root invariants, an existing source directory and a readable
    /// resume log when one is given.
    pub fn check_preconditions(&self) -> Result<()> {
        self.validate_roots()?;

        if !self.source_root.is_dir() {
            return Err(Error::SourceNotFound(self.source_root.clone()));
        }

        if let Some(log) = &self.resume_log {
            if !log.is_file() {
                return Err(Error::Ledger {
                    path: log.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no such file",
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Remove trailing separators so "/data/" and "/data" log identically
fn trim_trailing_separators(path: PathBuf) -> PathBuf {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches(['/', std::path::MAIN_SEPARATOR]);
    if trimmed.is_empty() || trimmed.len() == s.len() {
        path
    } else {
        PathBuf::from(trimmed)
    }
}

/// Absolute, lexically normalized form used for root comparison
pub fn normalize_for_compare(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| {
        Error::InvalidConfig(format!("cannot resolve {}: {}", path.display(), e))
    })?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    if cfg!(windows) {
        Ok(PathBuf::from(normalized.to_string_lossy().to_lowercase()))
    } else {
        Ok(normalized)
    }
}
