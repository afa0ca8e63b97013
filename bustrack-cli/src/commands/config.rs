//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show` and `config path`.

use std::path::PathBuf;

use bustrack::config::{config_file_path, ConfigFile};
use clap::Subcommand;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a commented config file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Write to this path instead of ~/.bustrack/config.ini
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show the effective configuration
    Show {
        /// Read this file instead of ~/.bustrack/config.ini
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force, path } => {
            run_init(path.unwrap_or_else(config_file_path), force)
        }
        ConfigCommands::Show { path } => run_show(path.unwrap_or_else(config_file_path)),
        ConfigCommands::Path => run_path(),
    }
}

fn run_init(path: PathBuf, force: bool) -> Result<(), CliError> {
    if force {
        ConfigFile::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
    } else if ConfigFile::ensure_exists_at(&path)? {
        println!("Created {}", path.display());
    } else {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    Ok(())
}

fn run_show(path: PathBuf) -> Result<(), CliError> {
    let config = ConfigFile::load_from(&path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "(defaults, no file)".to_string()
    };

    println!("Configuration: {}", source);
    println!();
    println!("[stream]");
    println!("  source = {}", config.stream.source);
    println!("  api_url = {}", config.stream.api_url);
    println!("  poll_interval_secs = {}", config.stream.poll_interval_secs);
    println!("  max_retries = {}", config.stream.max_retries);
    println!("  tick_interval_ms = {}", config.stream.tick_interval_ms);
    println!("  connect_delay_ms = {}", config.stream.connect_delay_ms);
    println!();
    println!("[alerts]");
    println!("  stops_ahead = {}", config.alerts.stops_ahead);
    println!("  policy = {}", config.alerts.policy);
    println!("  fallback_eta_minutes = {}", config.alerts.fallback_eta_minutes);
    println!("  min_speed_samples = {}", config.alerts.min_speed_samples);
    println!();
    println!("[marker]");
    println!("  animation_ms = {}", config.marker.animation_ms);
    println!("  easing = {}", config.marker.easing);
    println!();
    println!("[simulation]");
    match config.simulation.seed {
        Some(seed) => println!("  seed = {}", seed),
        None => println!("  seed = (random)"),
    }
    println!("  jitter_deg = {}", config.simulation.jitter_deg);
    println!("  speed_min_kmh = {}", config.simulation.speed_min_kmh);
    println!("  speed_max_kmh = {}", config.simulation.speed_max_kmh);
    println!();
    println!("[logging]");
    println!("  directory = {}", config.logging.directory);
    println!("  file = {}", config.logging.file);

    Ok(())
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}
