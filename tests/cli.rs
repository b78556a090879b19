use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const EVENT: &str = r#"{"energy_deposit":1.0,"hit_start_x":[0.0],"hit_start_y":[0.0],"hit_start_z":[100.0],"hit_start_t":[0.0],"hit_energy_deposit":[1.0],"hit_length":[0.5],"hit_track_id":[1],"particle_pdg_code":[22]}"#;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scint"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn path(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn cli_missing_positionals_exit_one() {
    assert_eq!(run_cli(&[]).status.code(), Some(1));
    assert_eq!(run_cli(&["events.json", "geometry.txt"]).status.code(), Some(1));
}

#[test]
fn cli_missing_geometry_exit_one() {
    let dir = tempdir().unwrap();
    let events = dir.path().join("events.json");
    fs::write(&events, EVENT).unwrap();
    let output = dir.path().join("out.jsonl");

    let result = run_cli(&[
        path(&events),
        path(&dir.path().join("does_not_exist.txt")),
        "0.4",
        path(&output),
    ]);
    assert_eq!(result.status.code(), Some(1));
}

#[test]
fn cli_help_exit_zero() {
    let result = run_cli(&["--help"]);
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("--medium"));
}

#[test]
fn cli_writes_one_line_per_event() {
    let dir = tempdir().unwrap();
    let events = dir.path().join("events.json");
    fs::write(&events, format!("{EVENT}\n{EVENT}\n")).unwrap();
    let geometry = dir.path().join("geometry.txt");
    fs::write(&geometry, "0 0.0 0.0 50.0 0 3\n").unwrap();
    let output = dir.path().join("out.jsonl");

    let result = run_cli(&[
        path(&events),
        path(&geometry),
        "10",
        path(&output),
        "false",
        "--seed",
        "1",
    ]);
    assert!(result.status.success());

    let lines: Vec<serde_json::Value> = fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["event"], 1);
    assert!(lines[0].get("input").is_none());
    assert!(!lines[0]["sensors"][0]["photon_times_us"]
        .as_array()
        .unwrap()
        .is_empty());
}
