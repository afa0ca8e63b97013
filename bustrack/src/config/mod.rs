//! User configuration.
//!
//! Settings live in `~/.bustrack/config.ini`, one `[section]` per component:
//!
//! - `[stream]` - Position source and its timing
//! - `[alerts]` - Proximity alert policy and ETA fallback
//! - `[marker]` - Marker animation
//! - `[simulation]` - Simulated source randomness
//! - `[logging]` - Log file location
//!
//! # Example
//!
//! ```
//! use bustrack::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let tracking = config.tracking_config();
//! assert_eq!(tracking.evaluator.stops_ahead, 2);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    AlertSettings, ConfigFile, LoggingSettings, MarkerSettings, SimulationSettings, SourceKind,
    StreamSettings,
};
