//! Copy command - replicates a source tree into a destination root
//!
//! Settings from the configuration file provide defaults; command line flags
//! override them. Preconditions, the writer and the notifier are all checked
//! before the run log is created, so a rejected invocation leaves nothing
//! behind.

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use humansize::{format_size, BINARY};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cfscopy_core::{
    format_duration, parse_size, Controller, DurableWriter, LogFile, Notifier, RetryPolicy,
    RunConfig, RunSummary, Settings, WriteMode,
};

use crate::progress;

/// Arguments for the copy command
pub struct CopyArgs {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub retry: Option<u32>,
    pub retry_to: Option<u64>,
    pub resume: Option<PathBuf>,
    pub write_mode: Option<WriteMode>,
    pub block_size: Option<String>,
    pub verify: bool,
    pub log: Option<PathBuf>,
    pub notify: Option<bool>,
    pub json: bool,
    pub quiet: bool,
    pub config_file: Option<PathBuf>,
}

/// Conditionally println based on quiet mode
macro_rules! println_if {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            println!($($arg)*);
        }
    };
}

/// Execute the copy command
pub fn execute(args: CopyArgs) -> Result<()> {
    let settings = Settings::load_from_path(args.config_file.clone().or_else(Settings::config_path));
    let config = build_config(&args, &settings)?;

    config
        .check_preconditions()
        .context("Refusing to start copy")?;
    let writer = DurableWriter::for_run(&config).context("Invalid copy configuration")?;
    let notifier = if args.notify.unwrap_or(settings.notify.enabled) {
        build_notifier(&settings)?
    } else {
        None
    };

    let log_path = match &args.log {
        Some(path) => path.clone(),
        None => default_log_path(&settings.log.directory, Utc::now()),
    };
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let log = LogFile::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

    println_if!(args.quiet, "Logging to {}.", log_path.display());

    let pb = progress::spinner(args.quiet);
    let pb_for_progress = pb.clone();
    let mut controller = Controller::with_writer(config, Box::new(log), writer)
        .on_progress(move |p| progress::update(&pb_for_progress, p));
    if let Some(notifier) = notifier {
        controller = controller.notifier(notifier);
    }

    match controller.run() {
        Ok(summary) => {
            pb.finish_and_clear();
            println_if!(args.quiet, "{}", style("Finished!").green().bold());
            if args.json {
                let json = serde_json::to_string_pretty(&summary)
                    .context("Failed to serialize run summary")?;
                println!("{}", json);
            } else {
                print_summary(&summary, args.quiet);
            }
            Ok(())
        }
        Err(e) => {
            pb.finish_and_clear();
            println_if!(args.quiet, "{}", style("Failed!").red().bold());
            Err(e).with_context(|| format!("Run aborted; see {}", log_path.display()))
        }
    }
}

/// Merge flags over settings into a run configuration
fn build_config(args: &CopyArgs, settings: &Settings) -> Result<RunConfig> {
    let attempts = args.retry.unwrap_or(settings.copy.retry_attempts);
    let delay = args.retry_to.unwrap_or(settings.copy.retry_delay_secs);
    let policy = RetryPolicy::new(attempts, Duration::from_secs(delay))
        .context("Invalid retry settings")?;

    let write_mode = args.write_mode.unwrap_or(settings.copy.write_mode);

    let block_size = match &args.block_size {
        Some(size) => parse_size(size).with_context(|| format!("Invalid block size: {}", size))?,
        None => settings
            .block_size_bytes()
            .context("Invalid block size in settings")?,
    };

    Ok(RunConfig::new(&args.source, &args.destination)
        .retry_policy(policy)
        .write_mode(write_mode)
        .block_size(block_size)
        .verify(args.verify || settings.copy.verify)
        .resume_log(args.resume.clone()))
}

/// Timestamped log file name inside `dir`
fn default_log_path(dir: &Path, now: chrono::DateTime<Utc>) -> PathBuf {
    dir.join(format!("{}_cfscopy.log", now.format("%Y%m%d_%H%M%S")))
}

#[cfg(feature = "email")]
fn build_notifier(settings: &Settings) -> Result<Option<Box<dyn Notifier>>> {
    let notifier = cfscopy_core::SmtpNotifier::new(&settings.notify.smtp_target())
        .context("Invalid notification settings")?;
    Ok(Some(Box::new(notifier)))
}

#[cfg(not(feature = "email"))]
fn build_notifier(_settings: &Settings) -> Result<Option<Box<dyn Notifier>>> {
    tracing::warn!("E-mail support not compiled in; notification disabled");
    Ok(None)
}

fn print_summary(summary: &RunSummary, quiet: bool) {
    println_if!(
        quiet,
        "  {} {} directories, {} files ({})",
        style("Copied:").bold(),
        summary.directories_created,
        summary.files_copied,
        format_size(summary.bytes_copied, BINARY)
    );
    if summary.skipped > 0 {
        println_if!(
            quiet,
            "  {} {} entries already complete",
            style("Skipped:").bold(),
            summary.skipped
        );
    }
    println_if!(
        quiet,
        "  {} {}",
        style("Time:").bold(),
        format_duration(summary.elapsed_secs as u64)
    );
    if summary.log_failures > 0 {
        println_if!(
            quiet,
            "  {} {} events could not be written to the run log",
            style("Warning:").yellow(),
            summary.log_failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args() -> CopyArgs {
        CopyArgs {
            source: PathBuf::from("/data/src/"),
            destination: PathBuf::from("/data/dst"),
            retry: None,
            retry_to: None,
            resume: None,
            write_mode: None,
            block_size: None,
            verify: false,
            log: None,
            notify: None,
            json: false,
            quiet: true,
            config_file: None,
        }
    }

    #[test]
    fn test_build_config_from_settings() {
        let mut settings = Settings::default();
        settings.copy.retry_attempts = 9;
        settings.copy.write_mode = WriteMode::Sync;
        settings.copy.block_size = "64K".to_string();

        let config = build_config(&args(), &settings).unwrap();
        assert_eq!(config.source_root, PathBuf::from("/data/src"));
        assert_eq!(config.retry_policy.max_attempts, 9);
        assert_eq!(config.retry_policy.delay, Duration::from_secs(10));
        assert_eq!(config.write_mode, WriteMode::Sync);
        assert_eq!(config.block_size, 64 * 1024);
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = Settings::default();
        settings.copy.retry_attempts = 9;

        let a = CopyArgs {
            retry: Some(2),
            retry_to: Some(0),
            write_mode: Some(WriteMode::Buffered),
            block_size: Some("1M".to_string()),
            verify: true,
            resume: Some(PathBuf::from("old.log")),
            ..args()
        };
        let config = build_config(&a, &settings).unwrap();
        assert_eq!(config.retry_policy.max_attempts, 2);
        assert_eq!(config.retry_policy.delay, Duration::ZERO);
        assert_eq!(config.write_mode, WriteMode::Buffered);
        assert_eq!(config.block_size, 1024 * 1024);
        assert!(config.verify);
        assert_eq!(config.resume_log, Some(PathBuf::from("old.log")));
    }

    #[test]
    fn test_invalid_flags() {
        let settings = Settings::default();
        let zero = CopyArgs {
            retry: Some(0),
            ..args()
        };
        assert!(build_config(&zero, &settings).is_err());

        let size = CopyArgs {
            block_size: Some("lots".to_string()),
            ..args()
        };
        assert!(build_config(&size, &settings).is_err());
    }

    #[test]
    fn test_default_log_path() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            default_log_path(Path::new("/var/log"), now),
            PathBuf::from("/var/log/20240309_070501_cfscopy.log")
        );
    }
}
