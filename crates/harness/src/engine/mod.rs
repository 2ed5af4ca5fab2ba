//! External matching engine boundary.
//!
//! The engine is a black box: it receives a rule file and the sample files
//! and answers with a JSON document listing its findings. Everything the
//! harness needs from that document is captured by [`EngineOutput`].

mod command;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
pub use command::CommandEngine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a single engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("Failed to spawn engine: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("engine timed out after {0} seconds")]
  Timeout(u64),
  #[error("engine exited with status {code}: {stderr}")]
  ProcessFailed { code: i32, stderr: String },
  #[error("Failed to decode engine output: {0}")]
  Decode(#[from] serde_json::Error),
}

impl EngineError {
  /// The invocation itself failed (as opposed to succeeding with bad output).
  ///
  /// Invocation failures are recorded per rule file and the run goes on;
  /// decode failures mean the engine broke its output contract.
  pub fn is_invocation_failure(&self) -> bool {
    !matches!(self, EngineError::Decode(_))
  }
}

/// Start position of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
  /// 1-indexed line
  pub line: usize,
  #[serde(default)]
  pub col: usize,
}

/// One reported detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFinding {
  /// File the finding is in, as the engine reports it
  pub path: PathBuf,
  /// Rule id that fired
  pub check_id: String,
  pub start: Position,
}

impl EngineFinding {
  pub fn new(path: impl Into<PathBuf>, check_id: impl Into<String>, line: usize) -> Self {
    Self {
      path: path.into(),
      check_id: check_id.into(),
      start: Position { line, col: 1 },
    }
  }

  pub fn line(&self) -> usize {
    self.start.line
  }
}

/// Decoded engine output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
  pub results: Vec<EngineFinding>,
  /// Non-fatal problems the engine reported alongside its results
  #[serde(default)]
  pub errors: Vec<serde_json::Value>,
}

impl EngineOutput {
  pub fn from_findings(results: Vec<EngineFinding>) -> Self {
    Self {
      results,
      errors: Vec::new(),
    }
  }

  /// Decode the engine's stdout.
  pub fn from_json(output: &str) -> Result<Self, EngineError> {
    Ok(serde_json::from_str(output)?)
  }
}

/// A pattern-matching engine the harness can run rules with.
///
/// [`CommandEngine`] is the real implementation; tests substitute in-process
/// fakes.
#[async_trait]
pub trait MatchEngine: Send + Sync {
  /// The name of this engine (for logging)
  fn name(&self) -> &str;

  /// Run one rule file against its samples.
  async fn run(&self, rule_file: &Path, samples: &[PathBuf]) -> Result<EngineOutput, EngineError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_engine_output() {
    let json = r#"{
      "results": [
        {
          "check_id": "eqeq-is-bad",
          "path": "/tmp/eqeq.py",
          "start": {"line": 6, "col": 4},
          "end": {"line": 6, "col": 10},
          "extra": {"message": "useless comparison", "lines": "if x == x:"}
        }
      ],
      "errors": []
    }"#;

    let output = EngineOutput::from_json(json).unwrap();
    assert_eq!(output.results.len(), 1);
    assert_eq!(output.results[0].check_id, "eqeq-is-bad");
    assert_eq!(output.results[0].line(), 6);
    assert_eq!(output.results[0].path, PathBuf::from("/tmp/eqeq.py"));
  }

  #[test]
  fn test_decode_without_errors_field() {
    let output = EngineOutput::from_json(r#"{"results": []}"#).unwrap();
    assert!(output.results.is_empty());
    assert!(output.errors.is_empty());
  }

  #[test]
  fn test_decode_failure() {
    let err = EngineOutput::from_json("Traceback (most recent call last):").unwrap_err();
    assert!(matches!(err, EngineError::Decode(_)));
    assert!(!err.is_invocation_failure());

    // A result missing its line is a contract violation too
    let err = EngineOutput::from_json(r#"{"results": [{"check_id": "x", "path": "a.py", "start": {}}]}"#).unwrap_err();
    assert!(matches!(err, EngineError::Decode(_)));
  }

  #[test]
  fn test_invocation_failures() {
    assert!(EngineError::Timeout(5).is_invocation_failure());
    assert!(
      EngineError::ProcessFailed {
        code: 2,
        stderr: String::new()
      }
      .is_invocation_failure()
    );
    assert!(EngineError::Spawn(std::io::Error::other("missing")).is_invocation_failure());
  }
}
