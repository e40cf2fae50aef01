//! cfscopy - Resumable, fault-tolerant directory copy for durability testing
//!
//! # Usage
//!
//! ```bash
//! # Copy a tree, fsyncing every file and directory entry
//! cfscopy --src /data/tree --dst /mnt/under-test/tree
//!
//! # Use write-through handles and retry each operation 5 times, 30s apart
//! cfscopy --src /data/tree --dst /mnt/under-test/tree --write-mode sync --retry 5 --retry-to 30
//!
//! # After a crash, pick up where the previous run log ends
//! cfscopy --src /data/tree --dst /mnt/under-test/tree --resume 20240101_120000_cfscopy.log
//!
//! # Write a default settings file
//! cfscopy config --init
//! ```

use anyhow::Result;
use cfscopy_core::WriteMode;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// cfscopy - Resumable, fault-tolerant directory copy for durability testing
#[derive(Parser)]
#[command(name = "cfscopy")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE", env = "CFSCOPY_CONFIG")]
    config: Option<PathBuf>,

    /// Source directory
    #[arg(long = "src", visible_alias = "source", value_name = "DIR", required = true)]
    src: Option<PathBuf>,

    /// Destination directory
    #[arg(long = "dst", visible_alias = "destination", value_name = "DIR", required = true)]
    dst: Option<PathBuf>,

    /// Attempts per operation before the run is aborted
    #[arg(long, value_name = "N")]
    retry: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long = "retry-to", value_name = "SECONDS")]
    retry_to: Option<u64>,

    /// Resume from a previous run's log file
    #[arg(long, value_name = "LOGFILE")]
    resume: Option<PathBuf>,

    /// Durable write strategy
    #[arg(long, value_enum, value_name = "MODE")]
    write_mode: Option<WriteModeArg>,

    /// Block size for copying (e.g., 16K, 1M)
    #[arg(short, long, value_name = "SIZE")]
    block_size: Option<String>,

    /// Read back every copied file and compare checksums
    #[arg(long)]
    verify: bool,

    /// Run log path (defaults to a timestamped file in the log directory)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Send an e-mail when the run ends
    #[arg(long, conflicts_with = "no_notify")]
    notify: bool,

    /// Do not send an e-mail, even if enabled in settings
    #[arg(long)]
    no_notify: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Durable write strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum WriteModeArg {
    /// Buffered writes, then flush and fsync
    Buffered,
    /// Write-through handle (O_SYNC / FILE_FLAG_WRITE_THROUGH)
    #[value(alias = "osync", alias = "write-through")]
    Sync,
}

impl From<WriteModeArg> for WriteMode {
    fn from(arg: WriteModeArg) -> Self {
        match arg {
            WriteModeArg::Buffered => WriteMode::Buffered,
            WriteModeArg::Sync => WriteMode::Sync,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the settings file
    Config {
        /// Create a settings file with default values
        #[arg(long)]
        init: bool,

        /// Print the settings file path
        #[arg(long)]
        path: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Set up panic handler for nicer error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{} {}", style("Error:").red().bold(), panic_info);
    }));

    if let Err(e) = run() {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);

        // Show cause chain when backtraces are requested
        if std::env::var("RUST_BACKTRACE").is_ok() {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", style("Caused by:").yellow(), cause);
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Some(Commands::Config { init, path, json }) => {
            commands::config::execute(commands::config::ConfigArgs {
                init,
                path,
                json,
                quiet: cli.quiet,
                config_file: cli.config,
            })
        }
        None => {
            let (Some(source), Some(destination)) = (cli.src, cli.dst) else {
                anyhow::bail!("--src and --dst are required");
            };
            let notify = match (cli.notify, cli.no_notify) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::copy::execute(commands::copy::CopyArgs {
                source,
                destination,
                retry: cli.retry,
                retry_to: cli.retry_to,
                resume: cli.resume,
                write_mode: cli.write_mode.map(WriteMode::from),
                block_size: cli.block_size,
                verify: cli.verify,
                log: cli.log,
                notify,
                json: cli.json,
                quiet: cli.quiet,
                config_file: cli.config,
            })
        }
    }
}
