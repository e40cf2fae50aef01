//! Structured run events and the sinks that persist them
//!
//! Every event is rendered as one line of the run log:
//!
//! ```text
//! 2026-10-18 09:14:02,118 - INFO - File : /mnt/cfs/dst/a/b.txt
//! ```
//!
//! The log is append-only and doubles as the resume manifest, so the line
//! shape produced by [`Event::to_line`] and accepted by [`Event::parse_line`]
//! must stay in lockstep.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Timestamp layout of a log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Separator between the timestamp, level and message fields
pub const FIELD_SEPARATOR: &str = " - ";

/// Separator between a message's description and its path
pub const PATH_SEPARATOR: &str = " : ";

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Progress and completion records
    Info,
    /// Failed attempts and fatal conditions
    Error,
}

impl Level {
    /// Level name as written to the log
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "INFO" => Some(Level::Info),
            "ERROR" => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of work a completion record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completion {
    /// A directory was created
    DirectoryCreated,
    /// A file was written and persisted
    FileCopied,
    /// A directory was skipped because a prior run created it
    DirectoryExists,
    /// A file was skipped because a prior run copied it
    FileExists,
}

impl Completion {
    /// Message prefix for this completion
    pub fn label(&self) -> &'static str {
        match self {
            Completion::DirectoryCreated => "Directory",
            Completion::FileCopied => "File",
            Completion::DirectoryExists => "Directory already exists",
            Completion::FileExists => "File already exists",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Directory" => Some(Completion::DirectoryCreated),
            "File" => Some(Completion::FileCopied),
            "Directory already exists" => Some(Completion::DirectoryExists),
            "File already exists" => Some(Completion::FileExists),
            _ => None,
        }
    }
}

/// A timestamped run event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: Level,
    /// Single-line message
    pub message: String,
}

impl Event {
    /// Create an event stamped with the current time.
    ///
    /// Line breaks in `message` are folded into spaces so each event stays on
    /// one log line.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: single_line(&message.into()),
        }
    }

    /// Info-level event
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    /// Error-level event
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    /// Completion record for `path`.
    ///
    /// Returns `None` when the path would not read back unchanged from the
    /// log: it is not valid UTF-8, holds a line break, or starts or ends with
    /// whitespace. Such an entry gets no record and is redone on resume.
    pub fn completion(kind: Completion, path: &Path) -> Option<Self> {
        let text = loggable_path(path)?;
        Some(Self::info(format!(
            "{}{}{}",
            kind.label(),
            PATH_SEPARATOR,
            text
        )))
    }

    /// Render as a log line (without the trailing newline)
    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.message,
            sep = FIELD_SEPARATOR
        )
    }

    /// Parse a log line produced by [`Event::to_line`]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.splitn(3, FIELD_SEPARATOR);
        let timestamp = fields.next()?;
        let level = Level::parse(fields.next()?)?;
        let message = fields.next()?;

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();

        Some(Self {
            timestamp,
            level,
            message: message.to_string(),
        })
    }

    /// If this is an Info completion record, its kind and path
    pub fn as_completion(&self) -> Option<(Completion, PathBuf)> {
        if self.level != Level::Info {
            return None;
        }
        let (label, path) = self.message.split_once(PATH_SEPARATOR)?;
        let kind = Completion::from_label(label)?;
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        Some((kind, PathBuf::from(path)))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

fn loggable_path(path: &Path) -> Option<&str> {
    let text = path.to_str()?;
    let exact = !text.is_empty() && text.trim() == text && !text.contains(['\n', '\r']);
    exact.then_some(text)
}

fn single_line(message: &str) -> String {
    if message.contains(['\n', '\r']) {
        message
            .split(['\n', '\r'])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        message.to_string()
    }
}

/// Destination for run events
pub trait EventSink: Send {
    /// Append one event
    fn record(&mut self, event: &Event) -> io::Result<()>;
}

/// Event sink writing the line-oriented run log to a file.
///
/// Each line is flushed as soon as it is written so the log reflects every
/// completed operation up to the moment of an interruption.
pub struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogFile {
    /// Create (or truncate) the log at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for LogFile {
    fn record(&mut self, event: &Event) -> io::Result<()> {
        writeln!(self.writer, "{}", event.to_line())?;
        self.writer.flush()
    }
}

/// In-memory event sink, useful for embedding and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    events: Vec<Event>,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Render all events as log text
    pub fn to_text(&self) -> String {
        self.events
            .iter()
            .map(|e| format!("{}\n", e.to_line()))
            .collect()
    }
}

impl EventSink for MemoryLog {
    fn record(&mut self, event: &Event) -> io::Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Shared handle to a [`MemoryLog`], so a caller can inspect events after
/// handing the sink to a run
#[derive(Debug, Default, Clone)]
pub struct SharedMemoryLog(std::sync::Arc<std::sync::Mutex<MemoryLog>>);

impl SharedMemoryLog {
    /// Create an empty shared log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<Event> {
        match self.0.lock() {
            Ok(log) => log.events().to_vec(),
            Err(poisoned) => poisoned.into_inner().events().to_vec(),
        }
    }

    /// Render all events as log text
    pub fn to_text(&self) -> String {
        match self.0.lock() {
            Ok(log) => log.to_text(),
            Err(poisoned) => poisoned.into_inner().to_text(),
        }
    }
}

impl EventSink for SharedMemoryLog {
    fn record(&mut self, event: &Event) -> io::Result<()> {
        let mut log = self
            .0
            .lock()
            .map_err(|_| io::Error::other("event log lock poisoned"))?;
        log.record(event)
    }
}

/// Fans every event out to several sinks
pub struct Tee {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Tee {
    /// Combine sinks; events go to each in order
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for Tee {
    fn record(&mut self, event: &Event) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.record(event)?;
        }
        Ok(())
    }
}
