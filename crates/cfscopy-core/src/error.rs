//! Error types for the cfscopy core library

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cfscopy operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during read/write/sync/mkdir operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source and destination resolve to the same location
    #[error("`{source_root}` and `{destination_root}` are the same directory")]
    SameDirectory {
        /// Source root as given
        source_root: PathBuf,
        /// Destination root as given
        destination_root: PathBuf,
    },

    /// Destination lies inside the source tree
    #[error("Destination `{destination_root}` is inside source `{source_root}`")]
    NestedDestination {
        /// Source root as given
        source_root: PathBuf,
        /// Destination root as given
        destination_root: PathBuf,
    },

    /// Source root missing or not a directory
    #[error("Source not found or not a directory: {0}")]
    SourceNotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resume log could not be read
    #[error("Failed to read resume log {path}: {source}")]
    Ledger {
        /// Path of the log being parsed
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Source tree traversal failed
    #[error("Failed to walk source tree: {0}")]
    Walk(String),

    /// Read-back of the destination did not match the source
    #[error("Verification failed for {path}: expected {expected}, got {actual}")]
    VerificationFailed {
        /// Destination file that failed verification
        path: PathBuf,
        /// Digest of the source data
        expected: String,
        /// Digest of the destination data
        actual: String,
    },

    /// An operation failed on every permitted attempt
    #[error("Giving up on {path} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Destination path of the failed operation
        path: PathBuf,
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        source: Box<Error>,
    },
}

impl Error {
    /// Whether this error was raised before any work began
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::SameDirectory { .. }
                | Error::NestedDestination { .. }
                | Error::SourceNotFound(_)
                | Error::InvalidConfig(_)
                | Error::Ledger { .. }
        )
    }

    /// Whether this error terminated a run that was already under way
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::RetriesExhausted { .. } | Error::Walk(_))
    }
}

/// Result type alias using the cfscopy error type
pub type Result<T> = std::result::Result<T, Error>;
