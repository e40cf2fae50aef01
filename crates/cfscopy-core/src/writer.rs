//! Durable block writer
//!
//! This module provides the copy engine for cfscopy, handling:
//! - Block-based copying with configurable block sizes
//! - Pluggable durability strategies (buffered + fsync, or write-through)
//! - Parent directory sync so new entries survive a crash
//! - Optional read-back verification
//!
//! A copy only returns `Ok` once the destination's bytes are on stable
//! storage. Callers record completion after that point, never before.

use crate::config::{RunConfig, WriteMode};
use crate::error::{Error, Result};
use cfscopy_platform::PlatformError;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default block size for copy operations (16 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

/// Minimum block size (4 KiB)
pub const MIN_BLOCK_SIZE: usize = 4 * 1024;

/// Maximum block size (64 MiB)
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// An open destination file that can be made durable
pub trait DurableFile: Write + Send {
    /// Flush everything written so far to stable storage and close the file
    fn persist(self: Box<Self>) -> io::Result<()>;
}

/// How destination files are opened and made durable
#[cfg_attr(test, mockall::automock)]
pub trait WriteStrategy: Send + Sync {
    /// The mode this strategy implements
    fn mode(&self) -> WriteMode;

    /// Create or truncate `path` for writing
    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableFile>>;
}

/// Buffered writes, then flush and fsync on persist
#[derive(Debug, Clone, Copy)]
pub struct BufferedStrategy {
    capacity: usize,
}

impl BufferedStrategy {
    /// Create a strategy whose write buffer holds `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for BufferedStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

struct BufferedFile(BufWriter<File>);

impl Write for BufferedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl DurableFile for BufferedFile {
    fn persist(self: Box<Self>) -> io::Result<()> {
        let file = self.0.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl WriteStrategy for BufferedStrategy {
    fn mode(&self) -> WriteMode {
        WriteMode::Buffered
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableFile>> {
        let file = File::create(path)?;
        Ok(Box::new(BufferedFile(BufWriter::with_capacity(
            self.capacity,
            file,
        ))))
    }
}

/// Write-through handle; each write reaches stable storage before returning
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteThroughStrategy;

struct WriteThroughFile(File);

impl Write for WriteThroughFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl DurableFile for WriteThroughFile {
    fn persist(self: Box<Self>) -> io::Result<()> {
        // Data is already on disk; this persists size and timestamps
        self.0.sync_all()
    }
}

impl WriteStrategy for WriteThroughStrategy {
    fn mode(&self) -> WriteMode {
        WriteMode::Sync
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableFile>> {
        let file = cfscopy_platform::create_write_through(path).map_err(platform_io_error)?;
        Ok(Box::new(WriteThroughFile(file)))
    }
}

/// Select the strategy for `mode`.
///
/// Fails with [`Error::InvalidConfig`] when the platform has no
/// write-through backend.
pub fn strategy_for(mode: WriteMode, block_size: usize) -> Result<Box<dyn WriteStrategy>> {
    match mode {
        WriteMode::Buffered => Ok(Box::new(BufferedStrategy::new(block_size))),
        WriteMode::Sync if cfscopy_platform::write_through_supported() => {
            Ok(Box::new(WriteThroughStrategy))
        }
        WriteMode::Sync => Err(Error::InvalidConfig(
            "write mode 'sync' is not available on this platform".to_string(),
        )),
    }
}

pub(crate) fn platform_io_error(err: PlatformError) -> io::Error {
    match err {
        PlatformError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Unsupported, other.to_string()),
    }
}

/// Configuration for copy operations
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// Block size for read/write operations
    pub block_size: usize,

    /// Whether to sync the parent directory after creating an entry
    pub sync_parent: bool,

    /// Whether to read back and compare the destination after persisting
    pub verify: bool,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            sync_parent: true,
            verify: false,
        }
    }
}

impl WriteConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set block size (clamped to valid range)
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        self
    }

    /// Set parent directory sync
    pub fn sync_parent(mut self, sync: bool) -> Self {
        self.sync_parent = sync;
        self
    }

    /// Set verify mode
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Result of a file copy
#[derive(Debug, Clone)]
pub struct CopyResult {
    /// Where the bytes were written (after directory resolution)
    pub destination: PathBuf,

    /// Total bytes copied
    pub bytes_copied: u64,

    /// Total time elapsed, including sync and verification
    pub elapsed: Duration,

    /// SHA-256 of the copied data, when verification ran
    pub checksum: Option<String>,
}

/// Copies single files durably using a [`WriteStrategy`]
pub struct DurableWriter {
    config: WriteConfig,
    strategy: Box<dyn WriteStrategy>,
}

impl DurableWriter {
    /// Create a writer with default configuration and buffered writes
    pub fn new() -> Self {
        Self {
            config: WriteConfig::default(),
            strategy: Box::new(BufferedStrategy::default()),
        }
    }

    /// Create a writer with custom configuration and strategy
    pub fn with_strategy(config: WriteConfig, strategy: Box<dyn WriteStrategy>) -> Result<Self> {
        if config.verify && !cfg!(feature = "checksum") {
            return Err(Error::InvalidConfig(
                "verification requires the 'checksum' feature".to_string(),
            ));
        }
        Ok(Self { config, strategy })
    }

    /// Create a writer for `mode`
    pub fn for_mode(config: WriteConfig, mode: WriteMode) -> Result<Self> {
        let strategy = strategy_for(mode, config.block_size)?;
        Self::with_strategy(config, strategy)
    }

    /// Create the writer a run needs: its mode, block size and verify flag
    pub fn for_run(config: &RunConfig) -> Result<Self> {
        let write_config = WriteConfig::new()
            .block_size(config.block_size)
            .verify(config.verify);
        Self::for_mode(write_config, config.write_mode)
    }

    /// Current configuration
    pub fn config(&self) -> &WriteConfig {
        &self.config
    }

    /// Write mode of the active strategy
    pub fn mode(&self) -> WriteMode {
        self.strategy.mode()
    }

    /// Copy `source` to `destination` and persist it.
    ///
    /// If `destination` is an existing directory the file is placed inside it
    /// under the source's file name. The destination is created or truncated;
    /// on failure it may be left partially written.
    pub fn copy_file(&self, source: &Path, destination: &Path) -> Result<CopyResult> {
        let start_time = Instant::now();
        let destination = resolve_destination(source, destination);

        let mut reader = File::open(source)?;
        let mut target = self.strategy.create(&destination)?;

        let (bytes_copied, source_digest) = self.copy_stream(&mut reader, &mut *target)?;
        target.persist()?;

        if self.config.sync_parent {
            cfscopy_platform::sync_parent(&destination).map_err(platform_io_error)?;
        }

        let checksum = match source_digest {
            Some(expected) => {
                let actual = digest_file(&destination, self.config.block_size)?;
                if actual != expected {
                    return Err(Error::VerificationFailed {
                        path: destination,
                        expected,
                        actual,
                    });
                }
                Some(actual)
            }
            None => None,
        };

        Ok(CopyResult {
            destination,
            bytes_copied,
            elapsed: start_time.elapsed(),
            checksum,
        })
    }

    /// Copy a stream block by block.
    ///
    /// Returns the number of bytes written and, when verification is enabled,
    /// the hex SHA-256 of the data.
    pub fn copy_stream<R, W>(&self, source: &mut R, target: &mut W) -> Result<(u64, Option<String>)>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut buffer = vec![0u8; self.config.block_size];
        let mut hasher = self.config.verify.then(StreamDigest::new);
        let mut total = 0u64;

        loop {
            let bytes_read = read_exact_or_eof(source, &mut buffer)?;
            if bytes_read == 0 {
                break; // EOF
            }

            let block = &buffer[..bytes_read];
            if let Some(h) = hasher.as_mut() {
                h.update(block);
            }
            target.write_all(block)?;
            total += bytes_read as u64;
        }

        target.flush()?;
        Ok((total, hasher.map(StreamDigest::finalize_hex)))
    }
}

impl Default for DurableWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether [`create_directory`] made a new directory or found one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirOutcome {
    /// The directory was created
    Created,
    /// A directory was already present
    AlreadyPresent,
}

/// Create a single directory, treating an existing directory as success.
///
/// The parent is not created; the walker guarantees it already exists.
pub fn create_directory(path: &Path, sync_parent: bool) -> Result<DirOutcome> {
    let outcome = match std::fs::create_dir(path) {
        Ok(()) => DirOutcome::Created,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
            DirOutcome::AlreadyPresent
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if sync_parent {
        cfscopy_platform::sync_parent(path).map_err(platform_io_error)?;
    }
    Ok(outcome)
}

/// Destination path after resolving the "copy into directory" form
pub fn resolve_destination(source: &Path, destination: &Path) -> PathBuf {
    if destination.is_dir() {
        if let Some(name) = source.file_name() {
            return destination.join(name);
        }
    }
    destination.to_path_buf()
}

#[cfg(feature = "checksum")]
struct StreamDigest(sha2::Sha256);

#[cfg(feature = "checksum")]
impl StreamDigest {
    fn new() -> Self {
        use sha2::Digest;
        Self(sha2::Sha256::new())
    }

    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.0.update(data);
    }

    fn finalize_hex(self) -> String {
        use sha2::Digest;
        self.0
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

#[cfg(not(feature = "checksum"))]
struct StreamDigest;

#[cfg(not(feature = "checksum"))]
impl StreamDigest {
    fn new() -> Self {
        Self
    }

    fn update(&mut self, _data: &[u8]) {}

    fn finalize_hex(self) -> String {
        String::new()
    }
}

/// SHA-256 of a file's contents, read back from disk
fn digest_file(path: &Path, block_size: usize) -> Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; block_size];
    let mut digest = StreamDigest::new();
    loop {
        let n = read_exact_or_eof(&mut file, &mut buffer)?;
        if n == 0 {
            break;
        }
        digest.update(&buffer[..n]);
    }
    Ok(digest.finalize_hex())
}

/// Read exactly the buffer size or until EOF
fn read_exact_or_eof<R: Read + ?Sized>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut total_read = 0;

    while total_read < buffer.len() {
        match reader.read(&mut buffer[total_read..]) {
            Ok(0) => break, // EOF
            Ok(n) => total_read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }

    Ok(total_read)
}

/// Format duration for display
pub fn format_duration(seconds: u64) -> String {
    if seconds >= 3600 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if seconds >= 60 {
        let mins = seconds / 60;
        let secs = seconds % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", seconds)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Reader that hands out at most `chunk` bytes per call and is
    /// interrupted once
    struct TrickleReader {
        data: Cursor<Vec<u8>>,
        chunk: usize,
        interrupted: bool,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    // -------------------------------------------------------------------------
    // WriteConfig tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_write_config_default() {
        let config = WriteConfig::default();
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.block_size, 16 * 1024);
        assert!(config.sync_parent);
        assert!(!config.verify);
    }

    #[test]
    fn test_write_config_block_size_clamping() {
        // Too small
        let config = WriteConfig::new().block_size(100);
        assert_eq!(config.block_size, MIN_BLOCK_SIZE);

        // Too large
        let config = WriteConfig::new().block_size(1024 * 1024 * 1024);
        assert_eq!(config.block_size, MAX_BLOCK_SIZE);

        // Just right
        let config = WriteConfig::new().block_size(1024 * 1024);
        assert_eq!(config.block_size, 1024 * 1024);
    }

    // -------------------------------------------------------------------------
    // Format functions tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m");
    }

    // -------------------------------------------------------------------------
    // read_exact_or_eof tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_exact_or_eof_fills_across_short_reads() {
        let mut reader = TrickleReader {
            data: Cursor::new(pattern(100)),
            chunk: 7,
            interrupted: false,
        };
        let mut buffer = [0u8; 64];
        let n = read_exact_or_eof(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 64);
        assert_eq!(&buffer[..], &pattern(100)[..64]);

        let n = read_exact_or_eof(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 36);
        let n = read_exact_or_eof(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 0);
    }

    // -------------------------------------------------------------------------
    // copy_stream tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_copy_stream_integrity() {
        let data = pattern(50_000);
        let writer =
            DurableWriter::with_strategy(WriteConfig::new().block_size(4096), Box::new(BufferedStrategy::default()))
                .unwrap();

        let mut target = Vec::new();
        let (n, digest) = writer
            .copy_stream(&mut Cursor::new(data.clone()), &mut target)
            .unwrap();

        assert_eq!(n, 50_000);
        assert!(digest.is_none());
        assert_eq!(target, data);
    }

    #[test]
    fn test_copy_stream_empty_source() {
        let writer = DurableWriter::new();
        let mut target = Vec::new();
        let (n, _) = writer
            .copy_stream(&mut Cursor::new(Vec::<u8>::new()), &mut target)
            .unwrap();
        assert_eq!(n, 0);
        assert!(target.is_empty());
    }

    // -------------------------------------------------------------------------
    // copy_file tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_copy_file_buffered() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let data = pattern(100_000);
        std::fs::write(&src, &data).unwrap();

        let writer = DurableWriter::new();
        let result = writer.copy_file(&src, &dst).unwrap();

        assert_eq!(result.bytes_copied, 100_000);
        assert_eq!(result.destination, dst);
        assert_eq!(std::fs::read(&dst).unwrap(), data);
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn test_copy_file_write_through() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let data = pattern(40_000);
        std::fs::write(&src, &data).unwrap();

        let writer = DurableWriter::for_mode(WriteConfig::new(), WriteMode::Sync).unwrap();
        assert_eq!(writer.mode(), WriteMode::Sync);
        writer.copy_file(&src, &dst).unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), data);
    }

    #[test]
    fn test_copy_file_into_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("report.txt");
        let dst_dir = dir.path().join("out");
        std::fs::create_dir(&dst_dir).unwrap();
        std::fs::write(&src, b"contents").unwrap();

        let result = DurableWriter::new().copy_file(&src, &dst_dir).unwrap();

        assert_eq!(result.destination, dst_dir.join("report.txt"));
        assert_eq!(std::fs::read(dst_dir.join("report.txt")).unwrap(), b"contents");
    }

    #[test]
    fn test_copy_file_truncates_existing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        std::fs::write(&src, b"short").unwrap();
        std::fs::write(&dst, b"a much longer previous file").unwrap();

        DurableWriter::new().copy_file(&src, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"short");
    }

    #[test]
    fn test_copy_file_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = DurableWriter::new()
            .copy_file(&dir.path().join("nope"), &dir.path().join("dst"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[cfg(feature = "checksum")]
    #[test]
    fn test_copy_file_verified() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        std::fs::write(&src, b"hello").unwrap();

        let writer = DurableWriter::with_strategy(
            WriteConfig::new().verify(true),
            Box::new(BufferedStrategy::default()),
        )
        .unwrap();
        let result = writer.copy_file(&src, &dst).unwrap();

        assert_eq!(
            result.checksum.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[cfg(feature = "checksum")]
    #[test]
    fn test_copy_file_verification_mismatch() {
        // A strategy that silently drops the last byte
        struct Lossy;
        struct LossyFile(File);

        impl Write for LossyFile {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let keep = buf.len().saturating_sub(1);
                self.0.write_all(&buf[..keep])?;
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                self.0.flush()
            }
        }

        impl DurableFile for LossyFile {
            fn persist(self: Box<Self>) -> io::Result<()> {
                self.0.sync_all()
            }
        }

        impl WriteStrategy for Lossy {
            fn mode(&self) -> WriteMode {
                WriteMode::Buffered
            }
            fn create(&self, path: &Path) -> io::Result<Box<dyn DurableFile>> {
                Ok(Box::new(LossyFile(File::create(path)?)))
            }
        }

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        std::fs::write(&src, b"hello").unwrap();

        let writer =
            DurableWriter::with_strategy(WriteConfig::new().verify(true), Box::new(Lossy)).unwrap();
        let result = writer.copy_file(&src, &dir.path().join("dst.bin"));
        assert!(matches!(result, Err(Error::VerificationFailed { .. })));
    }

    #[test]
    fn test_strategy_create_failure_surfaces() {
        let mut strategy = MockWriteStrategy::new();
        strategy.expect_mode().return_const(WriteMode::Buffered);
        strategy
            .expect_create()
            .times(1)
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")));

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"x").unwrap();

        let writer = DurableWriter::with_strategy(WriteConfig::new(), Box::new(strategy)).unwrap();
        let err = writer.copy_file(&src, &dir.path().join("dst")).unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    // -------------------------------------------------------------------------
    // create_directory tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_create_directory_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new");

        assert_eq!(create_directory(&path, true).unwrap(), DirOutcome::Created);
        assert_eq!(
            create_directory(&path, true).unwrap(),
            DirOutcome::AlreadyPresent
        );
        assert!(path.is_dir());
    }

    #[test]
    fn test_create_directory_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("occupied");
        std::fs::write(&path, b"file").unwrap();

        assert!(matches!(
            create_directory(&path, false),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_create_directory_missing_parent_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b");
        assert!(create_directory(&path, false).is_err());
    }

    #[test]
    fn test_strategy_for_modes() {
        let buffered = strategy_for(WriteMode::Buffered, DEFAULT_BLOCK_SIZE).unwrap();
        assert_eq!(buffered.mode(), WriteMode::Buffered);

        let sync = strategy_for(WriteMode::Sync, DEFAULT_BLOCK_SIZE);
        if cfscopy_platform::write_through_supported() {
            assert_eq!(sync.unwrap().mode(), WriteMode::Sync);
        } else {
            assert!(matches!(sync, Err(Error::InvalidConfig(_))));
        }
    }
}
