//! Settings file management command

use anyhow::{Context, Result};
use console::style;
use cfscopy_core::Settings;
use std::path::PathBuf;

/// Arguments for the config command
pub struct ConfigArgs {
    /// Initialize a new settings file with defaults
    pub init: bool,
    /// Show the path to the settings file
    pub path: bool,
    /// Show settings in JSON format
    pub json: bool,
    /// Suppress output
    pub quiet: bool,
    /// Custom settings file path (overrides default)
    pub config_file: Option<PathBuf>,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    let config_path = args.config_file.clone().or_else(Settings::config_path);

    if args.path {
        match &config_path {
            Some(path) if !args.quiet => println!("{}", path.display()),
            None if !args.quiet => {
                eprintln!("{}", style("Could not determine config path").yellow())
            }
            _ => {}
        }
        return Ok(());
    }

    if args.init {
        return init_config(config_path, args.quiet);
    }

    show_config(config_path, args.json, args.quiet)
}

/// Write a settings file with default values, leaving an existing one alone
fn init_config(config_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    let path = config_path.context("Could not determine configuration directory")?;

    if path.exists() {
        if !quiet {
            eprintln!(
                "{} Settings file already exists at: {}",
                style("Warning:").yellow(),
                path.display()
            );
        }
        return Ok(());
    }

    let saved_path = Settings::default()
        .save_to_path(Some(path))
        .context("Failed to save settings file")?;

    if !quiet {
        println!(
            "{} Created settings file at: {}",
            style("Success:").green(),
            saved_path.display()
        );
        println!();
        println!("Example notification settings:");
        println!();
        println!("  [notify]");
        println!("  enabled = true");
        println!("  smtp = \"mail.example.com:25\"");
        println!("  sender = \"cfscopy@example.com\"");
        println!("  recipients = [\"storage-qa@example.com\"]");
    }

    Ok(())
}

/// Show the effective settings
fn show_config(config_path: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }

    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let settings = Settings::load_from_path(config_path.clone());

    if json {
        let json_output = serde_json::to_string_pretty(&settings)
            .context("Failed to serialize settings to JSON")?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("{}", style("cfscopy Settings").bold());
    println!();
    match &config_path {
        Some(path) if config_exists => {
            println!("  {} {}", style("Settings file:").dim(), path.display())
        }
        Some(path) => println!(
            "  {} {} {}",
            style("Settings file:").dim(),
            path.display(),
            style("(not found, using defaults)").yellow()
        ),
        None => println!(
            "  {} {}",
            style("Settings file:").dim(),
            style("(unavailable, using defaults)").yellow()
        ),
    }
    println!();

    println!("{}", style("[copy]").cyan());
    println!("  block_size       = {}", settings.copy.block_size);
    println!("  write_mode       = {}", settings.copy.write_mode);
    println!("  retry_attempts   = {}", settings.copy.retry_attempts);
    println!("  retry_delay_secs = {}", settings.copy.retry_delay_secs);
    println!("  verify           = {}", settings.copy.verify);
    println!();
    println!("{}", style("[log]").cyan());
    println!("  directory = {}", settings.log.directory.display());
    println!();
    println!("{}", style("[notify]").cyan());
    println!("  enabled    = {}", settings.notify.enabled);
    println!("  smtp       = {}", settings.notify.smtp);
    println!("  sender     = {}", settings.notify.sender);
    println!("  recipients = {}", settings.notify.recipients.join(", "));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_file_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/cfscopy_config.toml");

        init_config(Some(path.clone()), true).unwrap();
        assert!(path.exists());
        assert_eq!(Settings::load_from_path(Some(path.clone())), Settings::default());

        std::fs::write(&path, "[copy]\nretry_attempts = 8\n").unwrap();
        init_config(Some(path.clone()), true).unwrap();
        let kept = Settings::load_from_path(Some(path));
        assert_eq!(kept.copy.retry_attempts, 8);
    }

    #[test]
    fn test_init_without_path() {
        assert!(init_config(None, true).is_err());
    }
}
