//! JSON report format for run summaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::scoring::{ConfusionMatrix, InvocationError, RuleFileResult, RunSummary};

/// Complete run report in JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
  pub metadata: ReportMetadata,
  pub summary: ReportSummary,
  /// Per rule file results, in processing order
  pub rule_files: Vec<RuleFileResult>,
  /// Run-wide totals per rule id
  pub totals: BTreeMap<String, ConfusionMatrix>,
  pub untested: Vec<PathBuf>,
  pub invocation_errors: Vec<InvocationError>,
}

/// Report metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
  /// Report generation timestamp
  pub timestamp: DateTime<Utc>,
  /// Harness version
  pub version: String,
  /// Directory the rule files were collected from
  pub root: PathBuf,
}

/// Headline counts and the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub tested: usize,
  pub untested: usize,
  pub invocation_errors: usize,
  pub todo_count: usize,
  /// Rule ids whose totals have false positives or false negatives
  pub failed_rule_ids: Vec<String>,
  pub passed: bool,
}

impl JsonReport {
  /// Create a report from a finished run.
  pub fn from_summary(summary: &RunSummary, root: &Path, fail_on_engine_error: bool) -> Self {
    Self {
      metadata: ReportMetadata {
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        root: root.to_path_buf(),
      },
      summary: ReportSummary {
        tested: summary.tested_count(),
        untested: summary.untested_count(),
        invocation_errors: summary.invocation_error_count(),
        todo_count: summary.todo_count,
        failed_rule_ids: summary.failures().into_iter().map(String::from).collect(),
        passed: summary.passed(fail_on_engine_error),
      },
      rule_files: summary.tested.clone(),
      totals: summary.totals.clone(),
      untested: summary.untested.clone(),
      invocation_errors: summary.invocation_errors.clone(),
    }
  }

  /// Save report to a JSON file.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  /// Load report from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    let report = serde_json::from_str(&json)?;
    Ok(report)
  }
}
