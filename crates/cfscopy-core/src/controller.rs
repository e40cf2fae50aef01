//! Run controller
//!
//! Drives one replication run: checks the roots, loads the completion ledger
//! when resuming, walks the source tree and dispatches every entry that is not
//! already complete through the retry coordinator. Each successful operation
//! is recorded as an Info completion event right after the data is durable,
//! so the run log doubles as the ledger for the next resume.

use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::event::{Completion, Event, EventSink};
use crate::ledger::{self, CompletionSet};
use crate::notify::Notifier;
use crate::retry::with_retry;
use crate::walker::{EntryKind, TreeWalker};
use crate::writer::{create_directory, format_duration, DurableWriter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Progress after each walked entry
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    /// Entries handled so far, including skipped ones
    pub entries: u64,
    /// Directories created
    pub directories_created: u64,
    /// Files copied
    pub files_copied: u64,
    /// Entries skipped because the ledger lists them
    pub skipped: u64,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Destination path of the entry just handled
    pub current: PathBuf,
}

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(&RunProgress) + Send + Sync>;

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Source root
    pub source_root: PathBuf,
    /// Destination root
    pub destination_root: PathBuf,
    /// Directories created
    pub directories_created: u64,
    /// Files copied
    pub files_copied: u64,
    /// Entries skipped because a previous run completed them
    pub skipped: u64,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Wall time of the run in seconds
    pub elapsed_secs: f64,
    /// Events the run log failed to persist
    pub log_failures: u64,
}

impl RunSummary {
    /// Number of mkdir and copy operations performed
    pub fn operations(&self) -> u64 {
        self.directories_created + self.files_copied
    }

    fn describe(&self) -> String {
        format!(
            "Replicated {} to {}: {} directories created, {} files copied ({} bytes), {} entries already present, in {}.",
            self.source_root.display(),
            self.destination_root.display(),
            self.directories_created,
            self.files_copied,
            self.bytes_copied,
            self.skipped,
            format_duration(self.elapsed_secs as u64)
        )
    }
}

/// Replicates one source tree into a destination root
pub struct Controller {
    config: RunConfig,
    ctx: RunContext,
    writer: DurableWriter,
    notifier: Option<Box<dyn Notifier>>,
    progress_callback: Option<ProgressCallback>,
}

impl Controller {
    /// Create a controller whose writer follows the config's mode, block size
    /// and verify flag
    pub fn new(config: RunConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        let writer = DurableWriter::for_run(&config)?;
        Ok(Self::with_writer(config, sink, writer))
    }

    /// Create a controller with an explicit writer
    pub fn with_writer(config: RunConfig, sink: Box<dyn EventSink>, writer: DurableWriter) -> Self {
        let ctx = RunContext::new(sink, config.retry_policy);
        Self {
            config,
            ctx,
            writer,
            notifier: None,
            progress_callback: None,
        }
    }

    /// Notify `notifier` when the run finishes or fails
    pub fn notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set progress callback
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RunProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// Precondition failures return before anything is written, including the
    /// run log. After that, the first operation to exhaust its retries or a
    /// traversal failure stops the run; entries after it are not attempted.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.config.check_preconditions()?;

        let completed = match &self.config.resume_log {
            Some(log) => ledger::parse_completed(log)?,
            None => CompletionSet::new(),
        };

        let start = Instant::now();
        let mut summary = RunSummary {
            source_root: self.config.source_root.clone(),
            destination_root: self.config.destination_root.clone(),
            ..RunSummary::default()
        };

        self.ctx.info(format!(
            "Copying {} to {} with {} writes, {} attempts {}s apart",
            self.config.source_root.display(),
            self.config.destination_root.display(),
            self.config.write_mode,
            self.config.retry_policy.max_attempts,
            self.config.retry_policy.delay.as_secs()
        ));
        if let Some(log) = &self.config.resume_log {
            self.ctx.info(format!(
                "Resuming from {} with {} completed entries",
                log.display(),
                completed.len()
            ));
        }

        let outcome = self.replicate(&completed, &mut summary);
        summary.elapsed_secs = start.elapsed().as_secs_f64();
        summary.log_failures = self.ctx.sink_failures();

        match outcome {
            Ok(()) => {
                self.ctx.info("Finished!");
                tracing::info!(
                    "Run complete: {} operations, {} skipped",
                    summary.operations(),
                    summary.skipped
                );
                self.notify("cfscopy: Finished!", &summary.describe());
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Run aborted: {}", e);
                self.notify("cfscopy: Failed!", &format!("Run aborted: {}", e));
                Err(e)
            }
        }
    }

    fn replicate(&mut self, completed: &CompletionSet, summary: &mut RunSummary) -> Result<()> {
        let Self {
            config,
            ctx,
            writer,
            progress_callback,
            ..
        } = self;
        let destination_root = config.destination_root.as_path();
        let sync_parent = writer.config().sync_parent;

        if !destination_root.is_dir() {
            with_retry(ctx, destination_root, |_| {
                std::fs::create_dir_all(destination_root)?;
                create_directory(destination_root, sync_parent)?;
                Ok(())
            })?;
            ctx.info(format!(
                "Created destination root {}",
                destination_root.display()
            ));
        }

        let mut progress = RunProgress::default();

        for entry in TreeWalker::new(&config.source_root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    ctx.error(e.to_string());
                    return Err(e);
                }
            };

            let source = entry.rooted_at(&config.source_root);
            let destination = entry.rooted_at(destination_root);

            if completed.contains(&destination) {
                let kind = match entry.kind {
                    EntryKind::Directory => Completion::DirectoryExists,
                    EntryKind::File => Completion::FileExists,
                };
                record_completion(ctx, kind, &destination);
                summary.skipped += 1;
            } else {
                match entry.kind {
                    EntryKind::Directory => {
                        with_retry(ctx, &destination, |_| {
                            create_directory(&destination, sync_parent)
                        })?;
                        record_completion(ctx, Completion::DirectoryCreated, &destination);
                        summary.directories_created += 1;
                    }
                    EntryKind::File => {
                        let result = with_retry(ctx, &destination, |_| {
                            writer.copy_file(&source, &destination)
                        })?;
                        record_completion(ctx, Completion::FileCopied, &destination);
                        summary.files_copied += 1;
                        summary.bytes_copied += result.bytes_copied;
                    }
                }
            }

            progress.entries += 1;
            progress.directories_created = summary.directories_created;
            progress.files_copied = summary.files_copied;
            progress.skipped = summary.skipped;
            progress.bytes_copied = summary.bytes_copied;
            progress.current = destination;
            if let Some(callback) = progress_callback.as_ref() {
                callback(&progress);
            }
        }

        Ok(())
    }

    fn notify(&mut self, subject: &str, body: &str) {
        let Some(notifier) = self.notifier.as_ref() else {
            return;
        };
        if let Err(e) = notifier.send(subject, body) {
            self.ctx.error(e.to_string());
        }
    }
}

/// Record `kind` for `path`, or note that the entry has no resume record
/// when its path cannot be logged exactly
fn record_completion(ctx: &mut RunContext, kind: Completion, path: &Path) {
    match Event::completion(kind, path) {
        Some(event) => ctx.record(event),
        None => ctx.info(format!(
            "{} done without a resume record, name cannot be logged exactly: {}",
            kind.label(),
            path.display()
        )),
    }
}

/// Replicate `config` into a run log at `sink` without notification
pub fn replicate(config: RunConfig, sink: Box<dyn EventSink>) -> Result<RunSummary> {
    Controller::new(config, sink)?.run()
}
