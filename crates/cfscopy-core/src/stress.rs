//! Power-loss stress writer
//!
//! Appends numbered blocks of a random pattern to a file so that after a
//! power cut the file can be inspected for the last block that reached the
//! disk. Each block is a `\n<i>\n\n` header followed by `block_kib` copies of
//! one random 1 KiB pattern.

use crate::error::Result;
use crate::writer::platform_io_error;
use rand::RngCore;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Size of the random pattern repeated in each block
pub const PATTERN_SIZE: usize = 1024;

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "power.out";

/// Stress writer settings
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// File to write
    pub output: PathBuf,
    /// Pattern copies per block
    pub block_kib: usize,
    /// fsync after each block
    pub fsync: bool,
    /// Open the file write-through
    pub osync: bool,
    /// Stop after this many blocks; `None` writes until interrupted
    pub count: Option<u64>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            block_kib: 1,
            fsync: false,
            osync: false,
            count: None,
        }
    }
}

/// Writes the numbered block stream
pub struct StressWriter {
    config: StressConfig,
    pattern: Vec<u8>,
}

impl StressWriter {
    /// Create a writer with a fresh random pattern
    pub fn new(config: StressConfig) -> Self {
        let mut pattern = vec![0u8; PATTERN_SIZE];
        rand::thread_rng().fill_bytes(&mut pattern);
        Self::with_pattern(config, pattern)
    }

    /// Create a writer with a fixed pattern
    pub fn with_pattern(config: StressConfig, pattern: Vec<u8>) -> Self {
        Self { config, pattern }
    }

    /// Settings in use
    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Write blocks, calling `on_block` with each 1-indexed block number once
    /// that block has been handed to the OS (and synced, with `fsync`).
    ///
    /// Each block goes out in a single `write_all` on the file itself, so no
    /// reported block is still sitting in a user-space buffer.
    ///
    /// Returns the number of blocks written; only returns on error when no
    /// count is set.
    pub fn run<F>(&self, mut on_block: F) -> Result<u64>
    where
        F: FnMut(u64),
    {
        let mut out = open_output(&self.config.output, self.config.osync)?;
        let copies = self.config.block_kib.max(1);
        let block_len = self.pattern.len() * copies;
        let mut block = Vec::with_capacity(block_len + 32);

        tracing::debug!(
            "Writing {} byte blocks to {:?} (fsync: {}, osync: {})",
            block_len,
            self.config.output,
            self.config.fsync,
            self.config.osync
        );

        let mut written = 0u64;
        loop {
            if self.config.count.is_some_and(|limit| written >= limit) {
                break;
            }
            let index = written + 1;

            block.clear();
            block.extend_from_slice(block_header(index).as_bytes());
            for _ in 0..copies {
                block.extend_from_slice(&self.pattern);
            }
            out.write_all(&block)?;
            if self.config.fsync {
                out.sync_all()?;
            }

            written = index;
            on_block(index);
        }

        Ok(written)
    }
}

/// Header preceding block `index`
pub fn block_header(index: u64) -> String {
    format!("\n{}\n\n", index)
}

fn open_output(path: &Path, osync: bool) -> Result<File> {
    if osync {
        Ok(cfscopy_platform::create_write_through(path).map_err(platform_io_error)?)
    } else {
        Ok(File::create(path)?)
    }
}
