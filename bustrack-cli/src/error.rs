//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use bustrack::config::ConfigFileError;
use bustrack::coord::PolylineError;
use bustrack::tracking::{DirectoryError, SessionError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Routes file could not be loaded
    Routes(DirectoryError),
    /// Tracking session could not be opened
    Session(SessionError),
    /// Encoded polyline is malformed
    Polyline(PolylineError),
    /// Replay file could not be read
    Replay(String),
    /// Async runtime failure
    Runtime(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Session(SessionError::RouteNotFound(_)) => {
                eprintln!();
                eprintln!("Without --routes only the built-in 'demo' route is available.");
            }
            CliError::Session(SessionError::MissingToken) => {
                eprintln!();
                eprintln!("Pass the token issued at sign-in with --token.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Routes(e) => write!(f, "Failed to load routes: {}", e),
            CliError::Session(e) => write!(f, "Failed to start tracking: {}", e),
            CliError::Polyline(e) => write!(f, "Invalid polyline: {}", e),
            CliError::Replay(msg) => write!(f, "Failed to read replay file: {}", msg),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Routes(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Polyline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<DirectoryError> for CliError {
    fn from(e: DirectoryError) -> Self {
        CliError::Routes(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<PolylineError> for CliError {
    fn from(e: PolylineError) -> Self {
        CliError::Polyline(e)
    }
}
