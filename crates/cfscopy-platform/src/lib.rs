//! # cfscopy Platform
//!
//! Platform-specific adapters for durable file I/O.
//!
//! This crate provides the low-level pieces the durable writer needs beyond
//! what `std::fs` exposes portably:
//!
//! - opening a file in write-through mode, where every `write` reaches stable
//!   storage before returning (`O_SYNC` on Unix, `FILE_FLAG_WRITE_THROUGH` on
//!   Windows)
//! - syncing a directory so that a freshly created entry survives a crash
//!
//! Platforms without a write-through backend report
//! [`PlatformError::NotSupported`] rather than silently falling back to
//! buffered I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not supported on this platform
    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform operations interface
pub trait PlatformOps {
    /// Create (or truncate) `path` for writing with write-through semantics
    fn create_write_through(path: &Path) -> Result<File>;

    /// Flush the directory entry table of `dir` to stable storage
    fn sync_directory(dir: &Path) -> Result<()>;

    /// Whether this platform has a write-through backend
    fn write_through_supported() -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::UnixPlatform as Platform;
    } else if #[cfg(windows)] {
        mod windows;
        pub use windows::WindowsPlatform as Platform;
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(unix, windows))] {
        /// Create (or truncate) a file opened in write-through mode
        pub fn create_write_through(path: &Path) -> Result<File> {
            Platform::create_write_through(path)
        }

        /// Sync a directory so newly created entries in it are durable
        pub fn sync_directory(dir: &Path) -> Result<()> {
            Platform::sync_directory(dir)
        }

        /// Check whether write-through mode is available
        pub fn write_through_supported() -> bool {
            Platform::write_through_supported()
        }
    } else {
        /// Create a write-through file (unsupported platform)
        pub fn create_write_through(_path: &Path) -> Result<File> {
            Err(PlatformError::NotSupported(
                "write-through I/O is not available on this platform".to_string(),
            ))
        }

        /// Sync a directory (unsupported platform, no-op)
        pub fn sync_directory(_dir: &Path) -> Result<()> {
            Ok(())
        }

        /// Check write-through support (unsupported platform)
        pub fn write_through_supported() -> bool {
            false
        }
    }
}

/// Sync the parent directory of `path`, if it has one
pub fn sync_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => sync_directory(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::NotSupported("no O_SYNC".to_string());
        assert!(err.to_string().contains("Not supported"));
        assert!(err.to_string().contains("no O_SYNC"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let platform_err: PlatformError = io_err.into();
        assert!(matches!(platform_err, PlatformError::Io(_)));
    }

    #[test]
    fn test_sync_parent_of_bare_name() {
        // "file.txt" has an empty parent; nothing to sync
        assert!(sync_parent(Path::new("file.txt")).is_ok());
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn test_write_through_supported_on_desktop_platforms() {
        assert!(write_through_supported());
    }
}
