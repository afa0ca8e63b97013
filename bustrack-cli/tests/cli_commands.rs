//! End-to-end tests for the `bustrack` binary.
//!
//! Each test runs the built binary in a scratch directory so config and
//! log files never touch the real home directory.
//!
//! Run with: `cargo test -p bustrack-cli --test cli_commands`

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn bustrack(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bustrack"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run bustrack")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// Polyline
// ============================================================================

#[test]
fn test_polyline_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = bustrack(
        temp_dir.path(),
        &["polyline", "--json", "_p~iF~ps|U_ulLnnqC_mqNvxq`@"],
    );
    assert!(output.status.success());

    let points: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 3);
    assert!((points[0]["latitude"].as_f64().unwrap() - 38.5).abs() < 1e-9);
    assert!((points[2]["longitude"].as_f64().unwrap() + 126.453).abs() < 1e-9);
}

#[test]
fn test_polyline_truncated_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = bustrack(temp_dir.path(), &["polyline", "_p~iF~ps|"]);
    assert!(!output.status.success());
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_init_then_show() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.ini");
    let path_arg = config_path.to_str().unwrap();

    let init = bustrack(temp_dir.path(), &["config", "init", "--path", path_arg]);
    assert!(init.status.success());
    assert!(config_path.exists());

    // Second init without --force leaves the file alone
    std::fs::write(&config_path, "[alerts]\nstops_ahead = 4\n").unwrap();
    let again = bustrack(temp_dir.path(), &["config", "init", "--path", path_arg]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("already exists"));

    let show = bustrack(temp_dir.path(), &["config", "show", "--path", path_arg]);
    assert!(show.status.success());
    let text = stdout(&show);
    assert!(text.contains("stops_ahead = 4"));
    assert!(text.contains("source = simulated"));
}

#[test]
fn test_config_show_rejects_bad_value() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.ini");
    std::fs::write(&config_path, "[alerts]\nstops_ahead = soon\n").unwrap();

    let show = bustrack(
        temp_dir.path(),
        &["config", "show", "--path", config_path.to_str().unwrap()],
    );
    assert!(!show.status.success());
}

// ============================================================================
// Track
// ============================================================================

#[test]
fn test_track_unknown_route_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.ini");

    let output = bustrack(
        temp_dir.path(),
        &[
            "track",
            "--route",
            "nowhere",
            "--token",
            "t",
            "--config",
            config_path.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
}

#[test]
fn test_track_demo_route_for_a_second() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.ini");

    let output = bustrack(
        temp_dir.path(),
        &[
            "track",
            "--route",
            "demo",
            "--token",
            "t",
            "--seed",
            "7",
            "--duration",
            "1",
            "--config",
            config_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Tracking route demo"));
    assert!(text.contains("Stopped tracking route demo"));
    assert!(temp_dir.path().join("logs").join("bustrack.log").exists());
}

#[test]
fn test_track_replays_pushed_frames() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.ini");
    std::fs::write(&config_path, "[stream]\ntick_interval_ms = 100\n").unwrap();

    let replay_path = temp_dir.path().join("frames.jsonl");
    let frames = [
        r#"{"event":"bus:update","data":{"busId":"demo-bus","routeId":"demo","lat":37.7949,"lng":-122.4144,"speed":30.0,"timestamp":"2026-03-01T07:30:00Z"}}"#,
        r#"{"event":"bus:update","data":{"busId":"other-bus","routeId":"elsewhere","lat":1.0,"lng":1.0,"speed":30.0,"timestamp":"2026-03-01T07:30:00Z"}}"#,
    ];
    std::fs::write(&replay_path, frames.join("\n")).unwrap();

    let output = bustrack(
        temp_dir.path(),
        &[
            "track",
            "--route",
            "demo",
            "--token",
            "t",
            "--json",
            "--duration",
            "1",
            "--replay",
            replay_path.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let updates: Vec<_> = lines.iter().filter(|v| v["event"] == "bus:update").collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["data"]["busId"], "demo-bus");

    // Stop 6 of 8 is two stops before the subscriber's stop
    assert!(lines.iter().any(|v| v["event"] == "alert:upcoming_stop"));
}
