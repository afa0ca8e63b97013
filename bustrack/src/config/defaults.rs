//! Default values and constants for all configuration settings.
//!
//! Component defaults are re-used from the component modules so there is a
//! single source of truth; this module only adds the config-file ones and
//! the `ConfigFile::default()` implementation.

use super::settings::*;
use crate::source::http::{DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_SECS};
use crate::source::{
    DEFAULT_CONNECT_DELAY, DEFAULT_JITTER_DEG, DEFAULT_SPEED_MAX_KMH, DEFAULT_SPEED_MIN_KMH,
    DEFAULT_TICK_INTERVAL,
};
use crate::tracking::{
    AlertPolicy, Easing, DEFAULT_ANIMATION_DURATION, DEFAULT_FALLBACK_ETA_MINUTES,
    DEFAULT_MIN_SPEED_SAMPLES, DEFAULT_STOPS_AHEAD,
};

/// Default log directory, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "bustrack.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            stream: StreamSettings {
                source: SourceKind::default(),
                api_url: DEFAULT_API_URL.to_string(),
                poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
                max_retries: DEFAULT_MAX_RETRIES,
                tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
                connect_delay_ms: DEFAULT_CONNECT_DELAY.as_millis() as u64,
            },
            alerts: AlertSettings {
                stops_ahead: DEFAULT_STOPS_AHEAD,
                policy: AlertPolicy::default(),
                fallback_eta_minutes: DEFAULT_FALLBACK_ETA_MINUTES,
                min_speed_samples: DEFAULT_MIN_SPEED_SAMPLES,
            },
            marker: MarkerSettings {
                animation_ms: DEFAULT_ANIMATION_DURATION.as_millis() as u64,
                easing: Easing::default(),
            },
            simulation: SimulationSettings {
                seed: None,
                jitter_deg: DEFAULT_JITTER_DEG,
                speed_min_kmh: DEFAULT_SPEED_MIN_KMH,
                speed_max_kmh: DEFAULT_SPEED_MAX_KMH,
            },
            logging: LoggingSettings {
                directory: DEFAULT_LOG_DIR.to_string(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
