//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. The
//! `*_config()` methods on [`ConfigFile`] turn them into the runtime
//! configuration of the component they drive.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::source::http::HttpSourceConfig;
use crate::source::SimulatedSourceConfig;
use crate::tracking::{
    AlertPolicy, Easing, EtaEstimator, EvaluatorConfig, MarkerConfig, TrackingConfig,
};

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub stream: StreamSettings,
    pub alerts: AlertSettings,
    pub marker: MarkerSettings,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

/// Which position source to build for each session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Simulated,
    Http,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulated => write!(f, "simulated"),
            Self::Http => write!(f, "http"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(Self::Simulated),
            "http" => Ok(Self::Http),
            other => Err(format!(
                "unknown source '{}', expected 'simulated' or 'http'",
                other
            )),
        }
    }
}

/// Position stream settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    pub source: SourceKind,
    /// Backend base URL for the HTTP source.
    pub api_url: String,
    pub poll_interval_secs: u64,
    /// Consecutive HTTP failures before the stream errors out.
    pub max_retries: u32,
    /// Simulated sample interval.
    pub tick_interval_ms: u64,
    /// Simulated connection delay.
    pub connect_delay_ms: u64,
}

/// Proximity alert settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    pub stops_ahead: usize,
    pub policy: AlertPolicy,
    pub fallback_eta_minutes: u32,
    pub min_speed_samples: usize,
}

/// Marker animation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSettings {
    pub animation_ms: u64,
    pub easing: Easing,
}

/// Simulated source settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub jitter_deg: f64,
    pub speed_min_kmh: f64,
    pub speed_max_kmh: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log directory
    pub directory: String,
    /// Log file name inside `directory`
    pub file: String,
}

impl ConfigFile {
    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            evaluator: EvaluatorConfig {
                stops_ahead: self.alerts.stops_ahead,
                policy: self.alerts.policy,
                eta: EtaEstimator {
                    fallback_minutes: self.alerts.fallback_eta_minutes,
                    min_speed_samples: self.alerts.min_speed_samples,
                },
            },
            marker: MarkerConfig {
                duration: Duration::from_millis(self.marker.animation_ms),
                easing: self.marker.easing,
            },
            ..TrackingConfig::default()
        }
    }

    pub fn http_source_config(&self) -> HttpSourceConfig {
        HttpSourceConfig::new(
            self.stream.api_url.clone(),
            self.stream.poll_interval_secs,
            self.stream.max_retries,
        )
    }

    /// Simulated source settings; waypoints are left at the reference set
    /// and replaced per route by the caller.
    pub fn simulated_source_config(&self) -> SimulatedSourceConfig {
        SimulatedSourceConfig {
            tick_interval: Duration::from_millis(self.stream.tick_interval_ms),
            connect_delay: Duration::from_millis(self.stream.connect_delay_ms),
            jitter_deg: self.simulation.jitter_deg,
            speed_min_kmh: self.simulation.speed_min_kmh,
            speed_max_kmh: self.simulation.speed_max_kmh,
            seed: self.simulation.seed,
            ..SimulatedSourceConfig::default()
        }
    }
}
