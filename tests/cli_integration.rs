//! CLI behavior that does not need a Go toolchain.

mod common;

use common::{path_str, Workspace};
use serde_json::json;

#[test]
fn list_prints_catalog_in_order() {
    let ws = Workspace::sample();
    let run = ws.kata(&["list"]);
    assert_eq!(run.code, Some(0), "{}", run.stderr);
    let slugs: Vec<&str> = run
        .stdout
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    assert_eq!(slugs, vec!["add", "reverse", "fizzbuzz", "sum"]);
    assert!(run.stdout.contains("add\tAdd two numbers"));
}

#[test]
fn show_prints_description_and_skeleton() {
    let ws = Workspace::sample();
    let run = ws.kata(&["show", "add"]);
    assert_eq!(run.code, Some(0), "{}", run.stderr);
    assert!(run.stdout.starts_with("Add two numbers\n"));
    assert!(run.stdout.contains("returns the sum of a and b"));
    assert!(run.stdout.ends_with("func Add(a, b int) int {\n\treturn 0\n}\n"));

    let run = ws.kata(&["show", "add", "--skeleton"]);
    assert_eq!(run.stdout, "func Add(a, b int) int {\n\treturn 0\n}\n");
}

#[test]
fn show_unknown_kata_fails() {
    let ws = Workspace::sample();
    let run = ws.kata(&["show", "nope"]);
    assert_ne!(run.code, Some(0));
    assert!(run.stderr.contains("kata not found"), "{}", run.stderr);
}

#[test]
fn run_unknown_kata_reports_not_found() {
    let ws = Workspace::sample();
    let source = ws.write("x.go", "func X() {}");
    let run = ws.kata(&["run", "--kata", "nope", "--source", path_str(&source), "--json"]);
    assert_eq!(run.code, Some(1));
    assert_eq!(
        run.json(),
        json!({"stdout": "", "stderr": "kata not found", "total": 0, "passed": 0, "cases": []})
    );

    let run = ws.kata(&["run", "--kata", "nope", "--source", path_str(&source)]);
    assert_eq!(run.code, Some(1));
    assert_eq!(run.stdout, "kata not found\nKata: nope - 0/0 passed\n");
}

#[test]
fn config_prints_effective_values_with_overrides() {
    let ws = Workspace::sample();
    let run = ws.kata(&["config", "--go", "go1.22 -C .", "--timeout-seconds", "3"]);
    assert_eq!(run.code, Some(0), "{}", run.stderr);
    let config = run.json();
    assert_eq!(config["go_command"], "go1.22 -C .");
    assert_eq!(config["run_timeout_seconds"], 3.0);
    assert_eq!(config["build_timeout_seconds"], 120.0);
    assert_eq!(config["catalog"], path_str(&ws.catalog));
}

#[test]
fn invalid_override_is_rejected() {
    let ws = Workspace::sample();
    let run = ws.kata(&["config", "--timeout-seconds", "0"]);
    assert_ne!(run.code, Some(0));
    assert!(run.stderr.contains("run_timeout_seconds"), "{}", run.stderr);
}

#[test]
fn invalid_catalog_is_reported() {
    let ws = Workspace::with_katas(&[("add", &[("Add(1,1)", "2")])]);
    std::fs::write(&ws.catalog, r#"{"katas": [{"slug": "", "title": "t"}]}"#)
        .expect("overwrite catalog");
    let run = ws.kata(&["list"]);
    assert_ne!(run.code, Some(0));
    assert!(run.stderr.contains("empty slug"), "{}", run.stderr);
}

#[test]
fn verify_without_solutions_fails() {
    let ws = Workspace::sample();
    let empty = ws.dir.path().join("empty");
    std::fs::create_dir_all(&empty).expect("create dir");
    let run = ws.kata(&["verify", "--solutions", path_str(&empty)]);
    assert_ne!(run.code, Some(0));
    assert!(run.stderr.contains("no <slug>.go solution files"), "{}", run.stderr);
}
