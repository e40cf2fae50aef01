//! Unix platform implementation
//!
//! Write-through uses `O_SYNC`; directory sync opens the directory read-only
//! and calls `fsync` on it.

use crate::{PlatformError, PlatformOps, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Unix platform implementation
pub struct UnixPlatform;

impl PlatformOps for UnixPlatform {
    fn create_write_through(path: &Path) -> Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(PlatformError::Io)
    }

    fn sync_directory(dir: &Path) -> Result<()> {
        let handle = File::open(dir)?;
        match handle.sync_all() {
            Ok(()) => Ok(()),
            // Some filesystems (and some FUSE mounts) refuse fsync on directories
            Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
                tracing::debug!("Directory sync not supported for {:?}: {}", dir, e);
                Ok(())
            }
            Err(e) => Err(PlatformError::Io(e)),
        }
    }

    fn write_through_supported() -> bool {
        true
    }
}
