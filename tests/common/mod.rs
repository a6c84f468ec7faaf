//! Shared test infrastructure for integration tests.
// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Check if a Go toolchain is available; skip test if not.
pub fn skip_if_go_missing() -> bool {
    let missing = find_in_path("go").is_none();
    if missing {
        eprintln!("Skipping: go not available");
    }
    missing
}

/// Scratch workspace with its own config and catalog for driving `kata`.
pub struct Workspace {
    pub dir: TempDir,
    pub catalog: PathBuf,
    pub config: PathBuf,
}

/// Captured result of one `kata` invocation.
#[derive(Debug)]
pub struct Run {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Run {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}): {}", self.stdout))
    }
}

impl Workspace {
    /// Workspace whose catalog is the checked-in sample catalog.
    pub fn sample() -> Self {
        let text = std::fs::read_to_string(manifest_dir().join("fixtures/katas.json"))
            .expect("read sample catalog");
        Self::with_catalog_text(&text)
    }

    /// Workspace with a catalog built from `(slug, [(call, expected)])` pairs.
    pub fn with_katas(katas: &[(&str, &[(&str, &str)])]) -> Self {
        let katas: Vec<Value> = katas
            .iter()
            .map(|(slug, cases)| {
                let cases: Vec<Value> = cases
                    .iter()
                    .map(|(call, expected)| json!({"call": call, "expected": expected}))
                    .collect();
                json!({
                    "title": slug,
                    "slug": slug,
                    "description": "",
                    "visible_skeleton": "",
                    "test_cases": cases,
                })
            })
            .collect();
        Self::with_catalog_text(&json!({ "katas": katas }).to_string())
    }

    fn with_catalog_text(text: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let catalog = dir.path().join("katas.json");
        std::fs::write(&catalog, text).expect("write catalog");
        let config = dir.path().join("config.json");
        std::fs::write(
            &config,
            json!({
                "catalog": catalog,
                "build_timeout_seconds": 120.0,
                "run_timeout_seconds": 20.0,
            })
            .to_string(),
        )
        .expect("write config");
        Self {
            dir,
            catalog,
            config,
        }
    }

    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, text).expect("write file");
        path
    }

    pub fn kata(&self, args: &[&str]) -> Run {
        self.kata_with_stdin(args, None)
    }

    pub fn kata_with_stdin(&self, args: &[&str], stdin: Option<&str>) -> Run {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_kata"));
        cmd.arg("--config")
            .arg(&self.config)
            .args(args)
            .env("RUST_LOG", "warn")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().expect("spawn kata");
        if let Some(text) = stdin {
            child
                .stdin
                .take()
                .expect("stdin pipe")
                .write_all(text.as_bytes())
                .expect("write stdin");
        }
        let output = child.wait_with_output().expect("wait for kata");
        run_from(output)
    }

    /// Grade `source` for `slug` and return the JSON report.
    pub fn grade(&self, slug: &str, source: &str) -> (Run, Value) {
        let path = self.write(&format!("{slug}.submission.go"), source);
        let run = self.kata(&["run", "--kata", slug, "--source", path_str(&path), "--json"]);
        let report = run.json();
        (run, report)
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

fn run_from(output: Output) -> Run {
    Run {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
