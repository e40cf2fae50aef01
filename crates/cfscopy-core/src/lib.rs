//! # cfscopy Core
//!
//! Core library for cfscopy, a resumable recursive directory replicator whose
//! every write is made durable before it is recorded as done.
//!
//! ## Modules
//!
//! - `writer`: Block copy engine with buffered+fsync and write-through strategies
//! - `ledger`: Rebuilds the set of completed paths from a previous run log
//! - `walker`: Deterministic pre-order traversal of the source tree
//! - `retry`: Bounded retry with a fixed delay
//! - `controller`: Drives a run from preconditions to summary
//! - `event`: Run log events and sinks
//! - `notify`: End-of-run notification
//! - `settings`: Persistent user settings from configuration file
//! - `stress`: Power-loss stress writer
//!
//! ## Example
//!
//! ```ignore
//! use cfscopy_core::{Controller, LogFile, RunConfig, WriteMode};
//!
//! let config = RunConfig::new("/data/src", "/mnt/dst")
//!     .write_mode(WriteMode::Sync)
//!     .resume_log(Some("previous.log".into()));
//!
//! let log = LogFile::create("run.log")?;
//! let summary = Controller::new(config, Box::new(log))?
//!     .on_progress(|p| println!("{}", p.current.display()))
//!     .run()?;
//! println!("Copied {} files", summary.files_copied);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod event;
pub mod ledger;
pub mod notify;
pub mod retry;
pub mod settings;
pub mod stress;
pub mod walker;
pub mod writer;

pub use config::{RetryPolicy, RunConfig, WriteMode, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS};
pub use context::RunContext;
pub use controller::{replicate, Controller, ProgressCallback, RunProgress, RunSummary};
pub use error::{Error, Result};
pub use event::{Completion, Event, EventSink, Level, LogFile, MemoryLog, SharedMemoryLog, Tee};
pub use ledger::{parse_completed, CompletionSet};
#[cfg(feature = "email")]
pub use notify::SmtpNotifier;
pub use notify::{Notifier, NotifyError, SmtpTarget};
pub use retry::{with_retry, RetryState};
pub use settings::{parse_size, Settings, SettingsError};
pub use stress::{StressConfig, StressWriter};
pub use walker::{EntryKind, PathEntry, TreeWalker};
pub use writer::{
    format_duration, CopyResult, DurableWriter, WriteConfig, WriteStrategy,
    DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE,
};
