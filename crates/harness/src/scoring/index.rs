//! Findings grouped by file and rule id, and per-file scoring.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::confusion::{ConfusionMatrix, compute_confusion_matrix};
use crate::annotations::FileAnnotations;
use crate::engine::EngineOutput;
use crate::{HarnessError, Result};

/// Reported lines keyed by file, then by rule id.
///
/// Lines are kept as reported, duplicates included, so that a rule firing
/// twice on one line can be caught when the file is scored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingIndex {
  files: BTreeMap<PathBuf, BTreeMap<String, Vec<usize>>>,
}

impl FindingIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Index an engine's findings.
  ///
  /// Paths are canonicalized when they exist so they line up with the
  /// (canonical) sample paths; paths that cannot be resolved are kept as is.
  pub fn from_output(output: &EngineOutput) -> Self {
    let mut index = Self::new();
    for finding in &output.results {
      let path = std::fs::canonicalize(&finding.path).unwrap_or_else(|_| finding.path.clone());
      index.record(path, &finding.check_id, finding.line());
    }
    index
  }

  /// Record one reported line.
  pub fn record(&mut self, file: PathBuf, rule_id: &str, line: usize) {
    self
      .files
      .entry(file)
      .or_insert_with(BTreeMap::new)
      .entry(rule_id.to_string())
      .or_insert_with(Vec::new)
      .push(line);
  }

  /// Findings for one file (empty if the engine reported nothing there).
  pub fn for_file(&self, file: &Path) -> BTreeMap<String, Vec<usize>> {
    self.files.get(file).cloned().unwrap_or_default()
  }

  pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
    self.files.keys()
  }

  pub fn len(&self) -> usize {
    self.files.values().flat_map(|rules| rules.values()).map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Reported lines as a set, refusing duplicates.
fn distinct_lines(file: &Path, rule_id: &str, lines: &[usize]) -> Result<BTreeSet<usize>> {
  let mut distinct = BTreeSet::new();
  for &line in lines {
    if !distinct.insert(line) {
      return Err(HarnessError::DuplicateFinding {
        file: file.to_path_buf(),
        rule_id: rule_id.to_string(),
        line,
      });
    }
  }
  Ok(distinct)
}

/// Score one file: every rule id that was reported or expected gets a matrix.
pub fn score_file(
  file: &Path,
  reported: &BTreeMap<String, Vec<usize>>,
  expected: &FileAnnotations,
) -> Result<BTreeMap<String, ConfusionMatrix>> {
  let rule_ids: BTreeSet<&String> = reported.keys().chain(expected.expected.keys()).collect();

  let mut scores = BTreeMap::new();
  for rule_id in rule_ids {
    let reported_lines = match reported.get(rule_id) {
      Some(lines) => distinct_lines(file, rule_id, lines)?,
      None => BTreeSet::new(),
    };
    let expected_lines = expected.lines_for(rule_id);
    let cm = compute_confusion_matrix(&reported_lines, &expected_lines);

    debug!(
      file = %file.display(),
      rule_id = %rule_id,
      "reported: {:?}, expected: {:?}, confusion matrix: {:?}",
      reported_lines,
      expected_lines,
      cm.as_tuple()
    );
    scores.insert(rule_id.clone(), cm);
  }
  Ok(scores)
}

/// Score every file of one engine run and sum the matrices per rule id.
///
/// Files the engine reported on that are not annotated samples are scored
/// too (all their findings are false positives).
pub fn score_pairing(
  findings: &FindingIndex,
  annotations: &BTreeMap<PathBuf, FileAnnotations>,
) -> Result<BTreeMap<String, ConfusionMatrix>> {
  let files: BTreeSet<&PathBuf> = annotations.keys().chain(findings.files()).collect();
  let empty = FileAnnotations::default();

  let mut totals: BTreeMap<String, ConfusionMatrix> = BTreeMap::new();
  for file in files {
    let expected = annotations.get(file).unwrap_or(&empty);
    for (rule_id, cm) in score_file(file, &findings.for_file(file), expected)? {
      *totals.entry(rule_id).or_insert_with(ConfusionMatrix::default) += cm;
    }
  }
  Ok(totals)
}
