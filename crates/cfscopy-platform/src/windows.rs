//! Windows platform implementation
//!
//! Write-through uses `FILE_FLAG_WRITE_THROUGH`. NTFS does not allow opening
//! a directory as a regular file handle, so directory sync is a no-op; the
//! journal makes directory entries durable once the file data is flushed.

use crate::{PlatformError, PlatformOps, Result};
use std::fs::{File, OpenOptions};
use std::os::windows::fs::OpenOptionsExt;
use std::path::Path;
use windows_sys::Win32::Storage::FileSystem::FILE_FLAG_WRITE_THROUGH;

/// Windows platform implementation
pub struct WindowsPlatform;

impl PlatformOps for WindowsPlatform {
    fn create_write_through(path: &Path) -> Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(FILE_FLAG_WRITE_THROUGH)
            .open(path)
            .map_err(PlatformError::Io)
    }

    fn sync_directory(_dir: &Path) -> Result<()> {
        Ok(())
    }

    fn write_through_supported() -> bool {
        true
    }
}
