//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with `REMINDME_HOME` pointed at a fresh
//! temporary directory and verify outputs.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_remindme"))
        .args(args)
        .env("REMINDME_HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn add_corner_shop(home: &Path) -> String {
    let stdout = run_ok(
        home,
        &[
            "reminder", "add", "Buy milk", "--lat", "40.7128", "--lon", "-74.0060", "--radius",
            "100", "--category", "shopping", "--json",
        ],
    );
    let created: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    created["id"].as_str().unwrap().to_string()
}

#[test]
fn test_geo_distance() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(home.path(), &["geo", "distance", "40.7128,-74.0060", "34.0522,-118.2437"]);
    assert!(stdout.contains("km ("), "unexpected output: {stdout}");
}

#[test]
fn test_geo_within_negative_coordinates() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(home.path(), &["geo", "within", "-33.8688,151.2093", "-33.8688,151.2093", "10"]);
    assert!(stdout.starts_with("inside: 0m"));
    let stdout = run_ok(home.path(), &["geo", "within", "-33.8688,151.2093", "-33.9,151.2093", "10"]);
    assert!(stdout.starts_with("outside"));
}

#[test]
fn test_geo_rejects_bad_coordinates() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["geo", "distance", "95,0", "0,0"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_config_get_set_list() {
    let home = TempDir::new().unwrap();
    assert_eq!(run_ok(home.path(), &["config", "get", "engine.firing_margin_secs"]).trim(), "60");
    assert!(home.path().join("config.toml").exists());

    run_ok(home.path(), &["config", "set", "engine.firing_margin_secs", "120"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "engine.firing_margin_secs"]).trim(), "120");

    let list = run_ok(home.path(), &["config", "list"]);
    assert!(list.contains("engine.firing_margin_secs = 120"));

    let (_, _, code) = run_cli(home.path(), &["config", "get", "engine.bogus"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(home.path(), &["config", "set", "engine.tick_interval_secs", "0"]);
    assert_eq!(code, 1);

    run_ok(home.path(), &["config", "reset"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "engine.firing_margin_secs"]).trim(), "60");
}

#[test]
fn test_reminder_lifecycle() {
    let home = TempDir::new().unwrap();
    let id = add_corner_shop(home.path());

    let list: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["reminder", "list", "--json"])).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["activation"], "location");

    run_ok(home.path(), &["reminder", "complete", &id]);
    let active: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["reminder", "list", "--active", "--json"]))
            .unwrap();
    assert!(active.as_array().unwrap().is_empty());

    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["reminder", "stats"])).unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["by_category"]["shopping"], 1);

    run_ok(home.path(), &["reminder", "uncomplete", &id]);
    run_ok(home.path(), &["reminder", "delete", &id]);
    let (_, stderr, code) = run_cli(home.path(), &["reminder", "show", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_reminder_add_rejects_past_time() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["reminder", "add", "Too late", "--at", "2000-01-01T00:00:00Z"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("must be after"));
}

#[test]
fn test_reminder_add_requires_a_trigger() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["reminder", "add", "Nowhere"]);
    assert_eq!(code, 1);
}

#[test]
fn test_locate_reports_distances() {
    let home = TempDir::new().unwrap();
    let id = add_corner_shop(home.path());
    let stdout = run_ok(home.path(), &["locate", "--at", "40.7129,-74.0060"]);
    let output: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["sample"]["location"]["latitude"], 40.7129);
    assert_eq!(output["reminders"][0]["id"], id.as_str());
    assert_eq!(output["reminders"][0]["inside"], true);
}

#[test]
fn test_monitor_fires_reminder_from_track() {
    let home = TempDir::new().unwrap();
    let id = add_corner_shop(home.path());
    let track = home.path().join("track.json");
    std::fs::write(
        &track,
        r#"[
            { "latitude": 40.80, "longitude": -74.0060 },
            { "error": "timeout" },
            { "latitude": 40.7128, "longitude": -74.0060 },
            { "latitude": 40.7128, "longitude": -74.0060 }
        ]"#,
    )
    .unwrap();

    let stdout = run_ok(
        home.path(),
        &["monitor", "--track", track.to_str().unwrap(), "--quiet"],
    );
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.first().unwrap()["type"], "MonitoringStarted");
    let fired: Vec<_> = events
        .iter()
        .filter(|e| e["type"] == "ReminderFired")
        .collect();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["reminder_id"], id.as_str());
    assert_eq!(fired[0]["trigger"]["kind"], "location");
    let last = events.last().unwrap();
    assert_eq!(last["type"], "MonitoringStopped");
    assert_eq!(last["reason"], "stream_ended");

    let shown: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["reminder", "show", &id])).unwrap();
    assert_eq!(shown["notified"], true);
}

#[test]
fn test_monitor_without_permission_fails() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["config", "set", "notifications.enabled", "false"]);
    let (stdout, stderr, code) = run_cli(home.path(), &["monitor", "--at", "0,0", "--for-secs", "1"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("permission"));
}

#[test]
fn test_monitor_stops_on_sensor_failure() {
    let home = TempDir::new().unwrap();
    let track = home.path().join("denied.json");
    std::fs::write(&track, r#"[{ "error": "permission_denied" }]"#).unwrap();
    let (stdout, stderr, code) = run_cli(
        home.path(),
        &["monitor", "--track", track.to_str().unwrap(), "--quiet"],
    );
    assert_eq!(code, 1);
    assert!(stdout.contains("MonitoringStarted"));
    assert!(stderr.contains("Position sensor failed"));
}
