//! Run-wide aggregation and the pass/fail verdict.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::confusion::ConfusionMatrix;

/// An engine run that did not produce findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationError {
  pub rule_file: PathBuf,
  pub message: String,
}

/// Scores for one rule file, summed over its samples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFileResult {
  pub rule_file: PathBuf,
  pub samples: Vec<PathBuf>,
  /// Rule id -> matrix across every sample of this rule file
  pub scores: BTreeMap<String, ConfusionMatrix>,
  /// `todoruleid` markers across the samples
  pub todo_count: usize,
}

impl RuleFileResult {
  pub fn new(rule_file: &Path, samples: &[PathBuf]) -> Self {
    Self {
      rule_file: rule_file.to_path_buf(),
      samples: samples.to_vec(),
      ..Default::default()
    }
  }

  /// Nothing was reported and nothing was expected.
  ///
  /// Distinct from every check being good: no check took part at all.
  pub fn no_checks_fired(&self) -> bool {
    self.scores.is_empty()
  }

  /// Rule ids of this file that are not good.
  pub fn failures(&self) -> Vec<&str> {
    self
      .scores
      .iter()
      .filter(|(_, cm)| !cm.is_good())
      .map(|(id, _)| id.as_str())
      .collect()
  }

  pub fn is_good(&self) -> bool {
    self.scores.values().all(ConfusionMatrix::is_good)
  }
}

/// Everything a run produced, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
  /// Rule files with no paired sample
  pub untested: Vec<PathBuf>,
  pub tested: Vec<RuleFileResult>,
  pub invocation_errors: Vec<InvocationError>,
  /// Rule id -> matrix summed over the whole run
  pub totals: BTreeMap<String, ConfusionMatrix>,
  /// `todoruleid` markers across every scored sample
  pub todo_count: usize,
}

impl RunSummary {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record_untested(&mut self, rule_file: PathBuf) {
    self.untested.push(rule_file);
  }

  pub fn record_invocation_error(&mut self, rule_file: &Path, message: impl Into<String>) {
    self.invocation_errors.push(InvocationError {
      rule_file: rule_file.to_path_buf(),
      message: message.into(),
    });
  }

  /// Add one rule file's scores to the run-wide totals.
  pub fn record_result(&mut self, result: RuleFileResult) {
    for (rule_id, cm) in &result.scores {
      *self
        .totals
        .entry(rule_id.clone())
        .or_insert_with(ConfusionMatrix::default) += *cm;
    }
    self.todo_count += result.todo_count;
    debug!(
      rule_file = %result.rule_file.display(),
      rule_ids = result.scores.len(),
      todo_count = result.todo_count,
      "Recorded rule file result"
    );
    self.tested.push(result);
  }

  /// Rule ids whose run-wide totals are not good.
  pub fn failures(&self) -> Vec<&str> {
    self
      .totals
      .iter()
      .filter(|(_, cm)| !cm.is_good())
      .map(|(id, _)| id.as_str())
      .collect()
  }

  pub fn untested_count(&self) -> usize {
    self.untested.len()
  }

  pub fn tested_count(&self) -> usize {
    self.tested.len()
  }

  pub fn invocation_error_count(&self) -> usize {
    self.invocation_errors.len()
  }

  /// Overall verdict.
  ///
  /// Every rule id must be good. When `fail_on_engine_error` is set, a rule
  /// file whose engine run failed fails the run as well.
  pub fn passed(&self, fail_on_engine_error: bool) -> bool {
    if fail_on_engine_error && !self.invocation_errors.is_empty() {
      return false;
    }
    self.failures().is_empty()
  }

  /// Process exit code for the verdict: 0 pass, 1 fail.
  pub fn exit_code(&self, fail_on_engine_error: bool) -> i32 {
    if self.passed(fail_on_engine_error) { 0 } else { 1 }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn result(rule_file: &str, scores: &[(&str, ConfusionMatrix)], todo_count: usize) -> RuleFileResult {
    RuleFileResult {
      rule_file: PathBuf::from(rule_file),
      samples: vec![PathBuf::from(rule_file).with_extension("py")],
      scores: scores.iter().map(|(id, cm)| (id.to_string(), *cm)).collect(),
      todo_count,
    }
  }

  #[test]
  fn test_totals_sum_across_rule_files() {
    let mut summary = RunSummary::new();
    summary.record_result(result("a.yaml", &[("shared", ConfusionMatrix::new(2, 0, 0, 0))], 1));
    summary.record_result(result("b.yaml", &[("shared", ConfusionMatrix::new(1, 0, 1, 0))], 2));

    assert_eq!(summary.totals["shared"], ConfusionMatrix::new(3, 0, 1, 0));
    assert_eq!(summary.todo_count, 3);
    assert_eq!(summary.tested_count(), 2);
    assert_eq!(summary.failures(), vec!["shared"]);
    assert!(!summary.passed(false));
    assert_eq!(summary.exit_code(false), 1);
  }

  #[test]
  fn test_all_good_passes() {
    let mut summary = RunSummary::new();
    summary.record_result(result("a.yaml", &[("a", ConfusionMatrix::new(4, 0, 0, 0))], 0));
    summary.record_untested(PathBuf::from("lonely.yaml"));

    assert!(summary.failures().is_empty());
    assert_eq!(summary.untested_count(), 1);
    assert_eq!(summary.exit_code(true), 0);
  }

  #[test]
  fn test_rule_that_never_fires_is_good() {
    let mut summary = RunSummary::new();
    summary.record_result(result("quiet.yaml", &[], 0));

    assert!(summary.tested[0].no_checks_fired());
    assert!(summary.tested[0].is_good());
    assert!(summary.passed(true));
  }

  #[test]
  fn test_missed_expectation_fails() {
    let mut summary = RunSummary::new();
    summary.record_result(result("a.yaml", &[("missed", ConfusionMatrix::new(0, 0, 0, 3))], 0));

    assert_eq!(summary.tested[0].failures(), vec!["missed"]);
    assert!(!summary.passed(false));
  }

  #[test]
  fn test_invocation_error_policy() {
    let mut summary = RunSummary::new();
    summary.record_result(result("a.yaml", &[("a", ConfusionMatrix::new(1, 0, 0, 0))], 0));
    summary.record_invocation_error(Path::new("broken.yaml"), "engine exited with status 2: boom");

    assert_eq!(summary.invocation_error_count(), 1);
    assert_eq!(summary.exit_code(true), 1);
    assert_eq!(summary.exit_code(false), 0);
  }

  #[test]
  fn test_per_file_failures_independent_of_totals() {
    let mut summary = RunSummary::new();
    summary.record_result(result(
      "a.yaml",
      &[
        ("ok", ConfusionMatrix::new(1, 0, 0, 0)),
        ("noisy", ConfusionMatrix::new(0, 0, 2, 0)),
      ],
      0,
    ));

    assert_eq!(summary.tested[0].failures(), vec!["noisy"]);
    assert!(!summary.tested[0].is_good());
  }
}
