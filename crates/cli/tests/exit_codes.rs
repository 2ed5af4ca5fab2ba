//! The `ruletest` binary's exit codes, driven by a shell-script engine.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SAMPLE: &str = "x = 1\n# ruleid:eqeq\nx == x\n";

/// A test suite under `<temp>/rules` and an engine that replays
/// `<temp>/findings.json`.
struct Suite {
  temp: TempDir,
}

impl Suite {
  fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let rules = temp.path().join("rules");
    std::fs::create_dir_all(&rules).unwrap();
    std::fs::write(rules.join("eqeq.yaml"), "rules: []\n").unwrap();
    std::fs::write(rules.join("eqeq.py"), SAMPLE).unwrap();

    let engine = temp.path().join("engine.sh");
    std::fs::write(&engine, format!("#!/bin/sh\ncat '{}'\n", temp.path().join("findings.json").display())).unwrap();
    std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();

    Self { temp }
  }

  fn rules(&self) -> PathBuf {
    self.temp.path().join("rules")
  }

  /// Findings on `eqeq.py` for rule `eqeq` at the given lines.
  fn report_lines(&self, lines: &[usize]) {
    let sample = self.rules().join("eqeq.py");
    let results: Vec<String> = lines
      .iter()
      .map(|line| {
        format!(
          r#"{{"check_id": "eqeq", "path": "{}", "start": {{"line": {line}, "col": 1}}}}"#,
          sample.display()
        )
      })
      .collect();
    std::fs::write(
      self.temp.path().join("findings.json"),
      format!(r#"{{"results": [{}], "errors": []}}"#, results.join(", ")),
    )
    .unwrap();
  }

  fn run(&self, extra: &[&str]) -> Output {
    let engine = self.temp.path().join("engine.sh");
    Command::new(env!("CARGO_BIN_EXE_ruletest"))
      .arg(self.rules())
      .arg("--engine")
      .arg(&engine)
      .args(extra)
      // Keep the user's own config out of the run
      .env("RULETEST_CONFIG_DIR", self.temp.path().join("no-user-config"))
      .env_remove("RUST_LOG")
      .output()
      .unwrap()
  }
}

fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn matching_findings_exit_zero() {
  let suite = Suite::new();
  suite.report_lines(&[3]);

  let output = suite.run(&[]);

  assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
  assert!(stdout(&output).ends_with("all tests passed\n"));
}

#[test]
fn unannotated_finding_exits_one() {
  let suite = Suite::new();
  suite.report_lines(&[1, 3]);

  let output = suite.run(&[]);

  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).ends_with("1 checks failed tests\n"));
}

#[test]
fn duplicate_finding_exits_two() {
  let suite = Suite::new();
  suite.report_lines(&[3, 3]);

  let output = suite.run(&[]);

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("fired more than once on line 3"));
}

#[test]
fn invalid_project_config_exits_two() {
  let suite = Suite::new();
  suite.report_lines(&[3]);
  std::fs::write(suite.rules().join(".ruletest.toml"), "[engine]\ntimeout_secs = \"10\"\n").unwrap();

  let output = suite.run(&[]);

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("Failed to parse config"));
}

#[test]
fn failed_engine_exit_depends_on_policy() {
  let suite = Suite::new();
  // No findings.json: the engine's cat fails with a non-zero status
  let strict = suite.run(&[]);
  assert_eq!(strict.status.code(), Some(1));

  let lenient = suite.run(&["--allow-engine-errors"]);
  assert_eq!(lenient.status.code(), Some(0));
}

#[test]
fn listing_runs_no_engine() {
  let suite = Suite::new();
  let output = suite.run(&["--list"]);

  assert_eq!(output.status.code(), Some(0));
  let listing = stdout(&output);
  assert!(listing.contains("eqeq.yaml\n  eqeq.py\n"));
}
