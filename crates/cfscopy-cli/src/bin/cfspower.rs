//! cfspower - Verify filesystem data integrity during power loss
//!
//! Writes numbered blocks of a random pattern to a file until interrupted
//! (or until `--count` blocks are written), printing the running block
//! counter. After a power cut, the last intact block in the file shows how
//! much acknowledged data survived.
//!
//! ```bash
//! cfspower --fsync --bs 4
//! cfspower --osync --output /mnt/under-test/power.out
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cfscopy_core::{StressConfig, StressWriter};

/// cfspower - Verify filesystem data integrity during power loss
#[derive(Parser)]
#[command(name = "cfspower")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// fsync after each block is written
    #[arg(long)]
    fsync: bool,

    /// Open the file with O_SYNC (write-through)
    #[arg(long)]
    osync: bool,

    /// Block size in KiB
    #[arg(long = "bs", value_name = "KB", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    block_kib: u32,

    /// Stop after this many blocks
    #[arg(long, value_name = "N")]
    count: Option<u64>,

    /// File to write
    #[arg(short, long, value_name = "FILE", default_value = "power.out")]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the block counter
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
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

    if !cli.quiet {
        if cli.osync {
            println!("Using O_SYNC.");
        }
        if cli.fsync {
            println!("Using fsync.");
        }
    }

    let config = StressConfig {
        output: cli.output.clone(),
        block_kib: cli.block_kib as usize,
        fsync: cli.fsync,
        osync: cli.osync,
        count: cli.count,
    };

    let quiet = cli.quiet;
    let mut stdout = std::io::stdout();
    let written = StressWriter::new(config)
        .run(|i| {
            if !quiet {
                let _ = write!(stdout, "\r{}", i);
                let _ = stdout.flush();
            }
        })
        .with_context(|| format!("Failed writing {}", cli.output.display()))?;

    if !quiet {
        println!();
        println!("{} {} blocks written", style("Done:").green(), written);
    }
    Ok(())
}
