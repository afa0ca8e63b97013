//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let seed = config
        .simulation
        .seed
        .map(|s| s.to_string())
        .unwrap_or_default();

    format!(
        r#"[stream]
; Position source for tracking sessions:
;   simulated - Bus bounces along the route's stops (no backend needed)
;   http      - Polls the backend bus status endpoint
source = {}
; Backend base URL (http source only)
api_url = {}
; Seconds between status polls (http source only)
poll_interval_secs = {}
; Consecutive failed polls before the session is torn down
max_retries = {}
; Milliseconds between simulated samples
tick_interval_ms = {}
; Milliseconds before the simulated stream reports connected
connect_delay_ms = {}

[alerts]
; Alert when the bus is this many stops from your stop
stops_ahead = {}
; When to alert:
;   threshold - Once the bus is within stops_ahead stops (never misses)
;   exact     - Only when the bus is exactly stops_ahead stops away
policy = {}
; ETA in minutes used until enough speed samples have arrived
fallback_eta_minutes = {}
; Speed samples needed before the ETA is computed from speed
min_speed_samples = {}

[marker]
; Duration of the marker glide between samples, in milliseconds
animation_ms = {}
; Glide easing: linear or ease_in_out
easing = {}

[simulation]
; RNG seed for reproducible runs (empty = random)
seed = {}
; Total position jitter span in degrees
jitter_deg = {}
; Simulated speed band in km/h
speed_min_kmh = {}
speed_max_kmh = {}

[logging]
; Log directory (relative paths are resolved from the working directory)
directory = {}
; Log file name, cleared at the start of each run
file = {}
"#,
        config.stream.source,
        config.stream.api_url,
        config.stream.poll_interval_secs,
        config.stream.max_retries,
        config.stream.tick_interval_ms,
        config.stream.connect_delay_ms,
        config.alerts.stops_ahead,
        config.alerts.policy,
        config.alerts.fallback_eta_minutes,
        config.alerts.min_speed_samples,
        config.marker.animation_ms,
        config.marker.easing,
        seed,
        config.simulation.jitter_deg,
        config.simulation.speed_min_kmh,
        config.simulation.speed_max_kmh,
        config.logging.directory,
        config.logging.file,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::SourceKind;
    use crate::tracking::{AlertPolicy, Easing};
    use tempfile::TempDir;

    #[test]
    fn test_default_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let original = ConfigFile::default();
        original.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_custom_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut original = ConfigFile::default();
        original.stream.source = SourceKind::Http;
        original.stream.api_url = "https://example.org/api".to_string();
        original.alerts.policy = AlertPolicy::ExactDistance;
        original.marker.easing = Easing::Linear;
        original.simulation.seed = Some(7);
        original.simulation.jitter_deg = 0.0025;

        original.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_output_is_commented() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[stream]"));
        assert!(content.contains("; RNG seed"));
        assert!(content.contains("policy = threshold"));
        assert!(content.contains("easing = ease_in_out"));
    }
}
