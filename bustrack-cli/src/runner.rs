//! CLI runner for common setup.
//!
//! Loads the config file and initializes logging, so command handlers start
//! from a ready environment.

use std::path::Path;

use bustrack::config::ConfigFile;
use bustrack::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads config from `config_path` (or the default path) and starts
    /// logging at `info`, or `debug` when `debug_mode` is set.
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let default_filter = if debug_mode { "debug" } else { "info" };
        let logging_guard = init_logging(
            &config.logging.directory,
            &config.logging.file,
            default_filter,
        )
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("bustrack v{}", bustrack::VERSION);
        info!(
            log_file = %self.logging_guard.log_path().display(),
            "bustrack CLI: {} command", command
        );
    }
}
