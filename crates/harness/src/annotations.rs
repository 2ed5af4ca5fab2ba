//! Expectation annotations embedded in sample files.
//!
//! A sample marks every line a rule must fire on with a comment on the line
//! before it:
//!
//! ```text
//! # ruleid:eqeq-is-bad
//! if x == x:
//! ```
//!
//! `todoruleid` marks a detection the rule is known to miss. It counts as an
//! expectation unless todo annotations are ignored, and is always tallied.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ruletest_core::AnnotationConfig;
use serde::{Deserialize, Serialize};

use crate::{HarnessError, Result};

/// Source lines are scanned 0-indexed but engines report 1-indexed lines.
pub const LINE_NUMBER_BASE: usize = 1;

/// A marker annotates the line that follows it.
pub const ANNOTATED_LINE_OFFSET: usize = 1;

const ASSERTED_TOKEN: &str = "ruleid:";
const DEFERRED_TOKEN: &str = "todoruleid";

/// Reported line number a marker on 0-indexed line `marker_index` expects.
pub fn expected_line(marker_index: usize) -> usize {
  marker_index + LINE_NUMBER_BASE + ANNOTATED_LINE_OFFSET
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
  Asserted,
  Deferred,
}

/// Literal marker spellings for a set of comment prefixes.
#[derive(Debug, Clone)]
pub struct MarkerSyntax {
  asserted: Vec<String>,
  deferred: Vec<String>,
}

impl MarkerSyntax {
  /// Build the marker set for the given comment prefixes.
  ///
  /// Each prefix yields `P` + `ruleid:` and `P ruleid:` for asserted markers,
  /// and `P` + `todoruleid:` and `P todoruleid` for deferred ones.
  pub fn new(prefixes: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
    let mut asserted = Vec::new();
    let mut deferred = Vec::new();
    for prefix in prefixes {
      let prefix = prefix.as_ref();
      asserted.push(format!("{prefix}{ASSERTED_TOKEN}"));
      asserted.push(format!("{prefix} {ASSERTED_TOKEN}"));
      deferred.push(format!("{prefix}{DEFERRED_TOKEN}:"));
      deferred.push(format!("{prefix} {DEFERRED_TOKEN}"));
    }
    Self { asserted, deferred }
  }

  pub fn from_config(config: &AnnotationConfig) -> Self {
    Self::new(&config.comment_prefixes)
  }

  fn earliest(markers: &[String], line: &str) -> Option<usize> {
    markers.iter().filter_map(|m| line.find(m.as_str())).min()
  }

  /// Locate the first marker on a line, if any.
  fn find(&self, line: &str) -> Option<(MarkerKind, usize)> {
    let asserted = Self::earliest(&self.asserted, line).map(|pos| (MarkerKind::Asserted, pos));
    let deferred = Self::earliest(&self.deferred, line).map(|pos| (MarkerKind::Deferred, pos));
    match (asserted, deferred) {
      (Some(a), Some(d)) => Some(if d.1 < a.1 { d } else { a }),
      (a, d) => a.or(d),
    }
  }
}

impl Default for MarkerSyntax {
  fn default() -> Self {
    Self::from_config(&AnnotationConfig::default())
  }
}

/// Expectations extracted from one sample file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnnotations {
  /// Rule id -> 1-indexed lines the rule must fire on
  pub expected: BTreeMap<String, BTreeSet<usize>>,
  /// Number of `todoruleid` markers seen, whether or not they were honored
  pub todo_count: usize,
}

impl FileAnnotations {
  /// Read and parse a sample file.
  pub async fn load(path: &Path, syntax: &MarkerSyntax, ignore_todo: bool) -> Result<Self> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_annotations(path, &content, syntax, ignore_todo)
  }

  /// Expected lines for one rule id (empty if the rule is not annotated).
  pub fn lines_for(&self, rule_id: &str) -> BTreeSet<usize> {
    self.expected.get(rule_id).cloned().unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool {
    self.expected.is_empty()
  }
}

/// Rule id following a marker: the text after the first colon, up to the next.
fn rule_id_after(marker_text: &str) -> Option<&str> {
  marker_text
    .split(':')
    .nth(1)
    .map(str::trim)
    .filter(|id| !id.is_empty())
}

/// Extract expectations from a sample file's text.
///
/// `path` only labels errors. A marker without a rule id is fatal.
pub fn parse_annotations(path: &Path, content: &str, syntax: &MarkerSyntax, ignore_todo: bool) -> Result<FileAnnotations> {
  let mut annotations = FileAnnotations::default();

  for (index, line) in content.lines().enumerate() {
    let Some((kind, pos)) = syntax.find(line) else {
      continue;
    };

    if kind == MarkerKind::Deferred {
      annotations.todo_count += 1;
      if ignore_todo {
        continue;
      }
    }

    let rule_id = rule_id_after(&line[pos..]).ok_or_else(|| HarnessError::MalformedAnnotation {
      file: path.to_path_buf(),
      line: index + LINE_NUMBER_BASE,
      text: line.trim().to_string(),
    })?;

    annotations
      .expected
      .entry(rule_id.to_string())
      .or_insert_with(BTreeSet::new)
      .insert(expected_line(index));
  }

  Ok(annotations)
}
