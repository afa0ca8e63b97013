//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [stream] section
    if let Some(section) = ini.section(Some("stream")) {
        if let Some(v) = section.get("source") {
            config.stream.source = v.parse().map_err(|reason| {
                invalid("stream", "source", v, reason)
            })?;
        }
        if let Some(v) = non_empty(section, "api_url") {
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid(
                    "stream",
                    "api_url",
                    v,
                    "must start with http:// or https://",
                ));
            }
            config.stream.api_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = positive::<u64>(section, "stream", "poll_interval_secs")? {
            config.stream.poll_interval_secs = v;
        }
        if let Some(v) = positive::<u32>(section, "stream", "max_retries")? {
            config.stream.max_retries = v;
        }
        if let Some(v) = positive::<u64>(section, "stream", "tick_interval_ms")? {
            config.stream.tick_interval_ms = v;
        }
        if let Some(v) = section.get("connect_delay_ms") {
            config.stream.connect_delay_ms = v.trim().parse().map_err(|_| {
                invalid("stream", "connect_delay_ms", v, "must be a whole number of milliseconds")
            })?;
        }
    }

    // [alerts] section
    if let Some(section) = ini.section(Some("alerts")) {
        if let Some(v) = positive::<usize>(section, "alerts", "stops_ahead")? {
            config.alerts.stops_ahead = v;
        }
        if let Some(v) = section.get("policy") {
            config.alerts.policy = v
                .parse()
                .map_err(|reason| invalid("alerts", "policy", v, reason))?;
        }
        if let Some(v) = positive::<u32>(section, "alerts", "fallback_eta_minutes")? {
            config.alerts.fallback_eta_minutes = v;
        }
        if let Some(v) = positive::<usize>(section, "alerts", "min_speed_samples")? {
            config.alerts.min_speed_samples = v;
        }
    }

    // [marker] section
    if let Some(section) = ini.section(Some("marker")) {
        if let Some(v) = section.get("animation_ms") {
            config.marker.animation_ms = v.trim().parse().map_err(|_| {
                invalid("marker", "animation_ms", v, "must be a whole number of milliseconds")
            })?;
        }
        if let Some(v) = section.get("easing") {
            config.marker.easing = v
                .parse()
                .map_err(|reason| invalid("marker", "easing", v, reason))?;
        }
    }

    // [simulation] section
    if let Some(section) = ini.section(Some("simulation")) {
        if let Some(v) = non_empty(section, "seed") {
            config.simulation.seed = Some(v.parse().map_err(|_| {
                invalid("simulation", "seed", v, "must be an unsigned integer or empty")
            })?);
        }
        if let Some(v) = non_negative(section, "simulation", "jitter_deg")? {
            config.simulation.jitter_deg = v;
        }
        if let Some(v) = non_negative(section, "simulation", "speed_min_kmh")? {
            config.simulation.speed_min_kmh = v;
        }
        if let Some(v) = non_negative(section, "simulation", "speed_max_kmh")? {
            config.simulation.speed_max_kmh = v;
        }
        if config.simulation.speed_min_kmh > config.simulation.speed_max_kmh {
            return Err(invalid(
                "simulation",
                "speed_min_kmh",
                &config.simulation.speed_min_kmh.to_string(),
                "must not exceed speed_max_kmh",
            ));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = v.to_string();
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Trimmed value, or `None` when missing or blank.
fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an integer that must be at least 1.
fn positive<T>(section: &Properties, name: &str, key: &str) -> Result<Option<T>, ConfigFileError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match v.trim().parse::<T>() {
        Ok(parsed) if parsed >= T::from(1) => Ok(Some(parsed)),
        _ => Err(invalid(name, key, v, "must be a positive integer")),
    }
}

/// Parses a finite float that must be zero or more.
fn non_negative(section: &Properties, name: &str, key: &str) -> Result<Option<f64>, ConfigFileError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match v.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(Some(parsed)),
        _ => Err(invalid(name, key, v, "must be a non-negative number")),
    }
}
